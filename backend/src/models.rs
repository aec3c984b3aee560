use serde::{Deserialize, Serialize};

use crate::quote::QuoteTable;

// ── Health ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProviderInfo {
    pub name: String,
    pub available: bool,
}

// ── Generation brief ────────────────────────────────────────────────────

/// Marketing brief shared by both generation endpoints.
/// Every field is free text; absent fields read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub target: String,
    pub insurance_type: String,
    pub concern: String,
}

// ── Structured quote ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct QuoteData {
    #[serde(flatten)]
    pub table: QuoteTable,
    pub gender: String,
    pub age: String,
    pub target: String,
}

/// `{"success":true,"data":{..}}` or `{"success":false,"error":".."}`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct QuoteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<QuoteData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteResponse {
    pub fn ok(data: QuoteData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
