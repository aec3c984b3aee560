pub mod config;
pub mod error;
pub mod handlers;
pub mod lexicon;
pub mod models;
pub mod persona;
pub mod prompt;
pub mod quote;
pub mod relay;
pub mod state;
pub mod upstream;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tracing::Instrument;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Briefs are a few short fields; anything larger is not a brief.
const MAX_BODY_BYTES: usize = 64 * 1024;

// ═══════════════════════════════════════════════════════════════════════
//  Request correlation ID middleware
// ═══════════════════════════════════════════════════════════════════════

/// Middleware that generates a UUID v4 correlation ID for each request.
///
/// - Runs the rest of the request inside a `request` span carrying `request_id`
/// - Returns it in the `X-Request-Id` response header
/// - Accepts an incoming `X-Request-Id` header to propagate from upstream
async fn request_id_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = async move {
        tracing::debug!("request correlation ID assigned");
        next.run(req).await
    }
    .instrument(span)
    .await;

    if let Ok(header_value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header_value);
    }

    response
}

// ── OpenAPI documentation ────────────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Briefcast API",
        version = "1.0.0",
        description = "Insurance marketing copy generation: streaming relay and quote tables",
        license(name = "MIT")
    ),
    paths(
        handlers::health_check,
        handlers::readiness,
        handlers::generate_full,
        handlers::generate_excel_data,
    ),
    components(schemas(
        models::HealthResponse,
        models::ProviderInfo,
        models::GenerationRequest,
        models::QuoteResponse,
        models::QuoteData,
        quote::QuoteTable,
        quote::QuoteItem,
    )),
    tags(
        (name = "health", description = "Health & readiness endpoints"),
        (name = "generate", description = "Copy streaming & structured quotes"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the given shared state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/health/ready", get(handlers::readiness))
        .route("/api/generate/full", post(handlers::generate_full))
        .route("/api/generate/excel-data", post(handlers::generate_excel_data))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Static UI, when configured, answers every path the API does not.
    let app = match state.config.static_dir.clone() {
        Some(dir) => {
            tracing::info!("serving static UI from {}", dir.display());
            api.fallback_service(ServeDir::new(dir))
        }
        None => api,
    };

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
