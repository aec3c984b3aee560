//! Streaming copy endpoint: Gemini SSE in, NDJSON relay events out.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use crate::error::ApiError;
use crate::models::GenerationRequest;
use crate::persona;
use crate::prompt::build_copy_prompt;
use crate::relay::{spawn_session, RelaySession};
use crate::state::AppState;

// ═══════════════════════════════════════════════════════════════════════
//  POST /api/generate/full
// ═══════════════════════════════════════════════════════════════════════

/// Each response line is one of `{"type":"status","step":1|2,"msg":..}`,
/// `{"type":"content","data":..}` or `{"type":"done"}`. The status code is
/// always 200 once the body parses; upstream trouble shows up as a stream
/// with no content.
#[utoipa::path(post, path = "/api/generate/full", tag = "generate",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Streaming NDJSON relay events"),
        (status = 400, description = "Malformed request body")
    ))]
pub async fn generate_full(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;

    let persona = persona::resolve(&state.lexicon, &req.target, &req.concern);
    let prompt = build_copy_prompt(&req, &persona, state.lexicon.line_break());

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        session = %session_id,
        insurance_type = %req.insurance_type,
        persona = %persona.describe(),
        "generate stream"
    );

    let session = RelaySession::new(session_id, state.lexicon.clone(), state.config.idle_timeout);
    let mut events = spawn_session(session, state.generator.clone(), prompt);

    // Dropping this body (client gone) drops `events`, which stops the session.
    let ndjson_stream = async_stream::stream! {
        while let Some(event) = events.recv().await {
            yield Ok::<_, std::io::Error>(event.to_line());
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/x-ndjson")
        .header("cache-control", "no-cache")
        .header("x-content-type-options", "nosniff")
        .body(Body::from_stream(ndjson_stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
