// Request-level API errors.
//
// Only failures that happen before a session exists end up here. Upstream
// failures are absorbed by the relay and quote paths and never reach the client
// as HTTP errors.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

/// Logs full details server-side, returns sanitized JSON to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Structured error code string for programmatic consumption.
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::warn!("API error ({}): {} [request_id={}]", status.as_u16(), self, request_id);

        let message = match &self {
            ApiError::BadRequest(m) => m.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        };

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": message,
                "request_id": request_id,
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn bad_request_maps_to_400() {
        let resp = ApiError::BadRequest("missing body".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let resp = ApiError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
