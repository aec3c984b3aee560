//! Handler modules.
//!
//! - `generate`: streaming NDJSON copy endpoint
//! - `quote`: single-shot structured quote endpoint
//! - `health`: health and readiness

pub mod generate;
pub mod health;
pub mod quote;

// Re-export everything (including utoipa __path_* types needed by OpenApi derive)
pub use generate::*;
pub use health::*;
pub use quote::*;
