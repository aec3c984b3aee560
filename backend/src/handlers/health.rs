//! Health and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::models::*;
use crate::state::AppState;

// ═══════════════════════════════════════════════════════════════════════
//  GET /api/health
// ═══════════════════════════════════════════════════════════════════════

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let uptime = state.start_time.elapsed().as_secs();
    let config = &state.config;

    let resp = HealthResponse {
        status: if state.is_ready() { "healthy".to_string() } else { "starting".to_string() },
        version: env!("CARGO_PKG_VERSION").to_string(),
        app: "Briefcast".to_string(),
        uptime_seconds: uptime,
        providers: vec![
            ProviderInfo {
                name: "gemini".to_string(),
                available: config.gemini_api_key.is_some(),
            },
            ProviderInfo {
                name: "gemini-quote".to_string(),
                available: config.gemini_quote_api_key.is_some(),
            },
            ProviderInfo {
                name: "search".to_string(),
                available: config.search_configured(),
            },
        ],
    };

    Json(serde_json::to_value(resp).unwrap_or_else(|_| json!({"error": "serialization failed"})))
}

// ═══════════════════════════════════════════════════════════════════════
//  GET /api/health/ready
// ═══════════════════════════════════════════════════════════════════════

#[utoipa::path(
    get,
    path = "/api/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service not yet ready")
    )
)]
pub async fn readiness(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.is_ready() {
        Ok(Json(json!({ "ready": true })))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
