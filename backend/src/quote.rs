//! Structured quote table for the spreadsheet view.
//!
//! One single-shot request; the reply text is searched for a JSON object,
//! which must parse completely. Partial tables are never returned.

use serde::{Deserialize, Deserializer, Serialize};

use crate::upstream::{envelope_text, TextGenerator, UpstreamError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuoteItem {
    pub name: String,
    #[serde(deserialize_with = "text_or_number")]
    pub amount: String,
    #[serde(deserialize_with = "text_or_number")]
    pub premium: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuoteTable {
    pub product: String,
    pub company: String,
    pub items: Vec<QuoteItem>,
    #[serde(deserialize_with = "text_or_number")]
    pub total: String,
}

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("reply carries no candidate text")]
    NoText,

    #[error("reply text contains no JSON object")]
    NoJsonObject,

    #[error("quote JSON does not match the table shape: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Models write amounts either as `"3,000만원"` or as bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Span from the first `{` to the last `}`, inclusive.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a quote table out of a single-shot reply envelope.
pub fn parse_reply(envelope: &serde_json::Value) -> Result<QuoteTable, QuoteError> {
    let text = envelope_text(envelope).ok_or(QuoteError::NoText)?;
    let object = find_json_object(text).ok_or(QuoteError::NoJsonObject)?;
    Ok(serde_json::from_str(object)?)
}

pub async fn fetch_quote(generator: &dyn TextGenerator, prompt: &str) -> Result<QuoteTable, QuoteError> {
    let envelope = generator.generate(prompt).await?;
    parse_reply(&envelope)
}
