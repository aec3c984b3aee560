//! Generative backend boundary.
//!
//! - `client`: Gemini REST client (streaming + single-shot)
//! - `sse`: byte stream → lines → JSON envelopes
//! - `scripted`: in-memory generator for tests and local runs

pub mod client;
pub mod scripted;
pub mod sse;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde_json::Value;

pub use client::GeminiClient;
pub use scripted::ScriptedGenerator;

/// Raw response body of a streaming request. A mid-transfer failure surfaces
/// as an `Err` item, never as a silent end of stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("no credential configured for the generative backend")]
    MissingCredential,

    #[error("upstream request failed: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream broke mid-transfer: {0}")]
    Transport(String),

    #[error("upstream silent for {}s", .0.as_secs())]
    IdleTimeout(Duration),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl UpstreamError {
    /// `true` when the failure happened before any body byte was received.
    pub fn is_before_stream(&self) -> bool {
        matches!(
            self,
            UpstreamError::MissingCredential
                | UpstreamError::Unavailable(_)
                | UpstreamError::Status { .. }
        )
    }
}

/// A backend that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Open an incremental-delivery request and hand back its body.
    async fn stream_generate(&self, prompt: &str) -> Result<ByteStream, UpstreamError>;

    /// Issue a single-shot request and return the decoded JSON envelope.
    async fn generate(&self, prompt: &str) -> Result<Value, UpstreamError>;
}

/// Text of the first part of the first candidate, if every step is present.
pub fn envelope_text(envelope: &Value) -> Option<&str> {
    envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
}
