//! Gemini REST client.
//!
//! `streamGenerateContent?alt=sse` for the copy stream, `generateContent` for
//! the quote table. Credentials go in the `x-goog-api-key` header.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use serde_json::{json, Value};

use super::{ByteStream, TextGenerator, UpstreamError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Total timeout for single-shot requests. Streaming requests are bounded
    /// by the session's idle timeout instead.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    fn body(prompt: &str, temperature: f64) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": temperature },
        })
    }

    async fn post(&self, url: &str, body: &Value, timeout: Option<Duration>) -> Result<reqwest::Response, UpstreamError> {
        let key = self.api_key.as_deref().ok_or(UpstreamError::MissingCredential)?;

        let mut request = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request.send().await.map_err(UpstreamError::Unavailable)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status,
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn stream_generate(&self, prompt: &str) -> Result<ByteStream, UpstreamError> {
        let url = format!("{}?alt=sse", self.url("streamGenerateContent"));
        let resp = self.post(&url, &Self::body(prompt, 0.9), None).await?;
        tracing::debug!(model = %self.model, "upstream stream opened");

        Ok(resp
            .bytes_stream()
            .map_err(|e| UpstreamError::Transport(e.to_string()))
            .boxed())
    }

    async fn generate(&self, prompt: &str) -> Result<Value, UpstreamError> {
        let url = self.url("generateContent");
        let resp = self
            .post(&url, &Self::body(prompt, 0.4), Some(self.request_timeout))
            .await?;

        resp.json::<Value>()
            .await
            .map_err(|e| UpstreamError::MalformedResponse(e.to_string()))
    }
}

/// UTF-8 safe prefix of at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/v1beta/",
            "gemini-test",
            key.map(str::to_string),
        )
    }

    #[test]
    fn url_strips_trailing_slash() {
        assert_eq!(
            client(Some("k")).url("generateContent"),
            "http://127.0.0.1:9/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", client(Some("secret-key")));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn body_wraps_prompt_in_contents() {
        let body = GeminiClient::body("hello", 0.5);
        assert_eq!(body.pointer("/contents/0/parts/0/text").and_then(|v| v.as_str()), Some("hello"));
        assert_eq!(body.pointer("/contents/0/role").and_then(|v| v.as_str()), Some("user"));
    }

    #[test]
    fn truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("가나다라", 2), "가나...");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let err = match client(None).stream_generate("x").await {
            Err(e) => e,
            Ok(_) => panic!("expected missing credential"),
        };
        assert!(matches!(err, UpstreamError::MissingCredential));

        let err = client(Some("")).generate("x").await.unwrap_err();
        assert!(matches!(err, UpstreamError::MissingCredential));
    }
}
