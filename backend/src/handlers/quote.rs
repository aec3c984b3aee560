//! Structured quote endpoint for the spreadsheet view.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::models::{GenerationRequest, QuoteData, QuoteResponse};
use crate::persona;
use crate::prompt::build_quote_prompt;
use crate::quote::fetch_quote;
use crate::state::AppState;

const QUOTE_FAILED: &str = "견적 데이터를 생성하지 못했습니다. 잠시 후 다시 시도해 주세요.";

// ═══════════════════════════════════════════════════════════════════════
//  POST /api/generate/excel-data
// ═══════════════════════════════════════════════════════════════════════

/// Always 200 once the body parses: `success` tells whether a complete quote
/// table came back. Partial tables are never returned.
#[utoipa::path(post, path = "/api/generate/excel-data", tag = "generate",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Quote table or uniform failure", body = QuoteResponse),
        (status = 400, description = "Malformed request body")
    ))]
pub async fn generate_excel_data(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let Json(req) = payload?;

    let persona = persona::resolve(&state.lexicon, &req.target, &req.concern);
    let prompt = build_quote_prompt(&req, &persona);

    match fetch_quote(state.quote_generator.as_ref(), &prompt).await {
        Ok(table) => {
            tracing::info!(items = table.items.len(), persona = %persona.describe(), "quote generated");
            Ok(Json(QuoteResponse::ok(QuoteData {
                table,
                gender: persona.gender.label().to_string(),
                age: persona.age_label(),
                target: req.target,
            })))
        }
        Err(e) => {
            tracing::warn!(error = %e, "quote extraction failed");
            Ok(Json(QuoteResponse::failed(QUOTE_FAILED)))
        }
    }
}
