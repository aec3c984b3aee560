//! In-memory generator that replays canned responses.
//!
//! Used by `AppState::new_test` and the test suites; never talks to a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::Value;

use super::{ByteStream, TextGenerator, UpstreamError};

#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    /// `None` makes `stream_generate` fail before streaming.
    chunks: Option<Vec<Result<Bytes, String>>>,
    /// `None` makes `generate` fail.
    reply: Option<Value>,
    /// Keep the stream open after the last chunk instead of ending it.
    hang: bool,
    /// Never answer `stream_generate` at all, like a backend that accepts the
    /// connection but never sends headers.
    silent: bool,
}

impl ScriptedGenerator {
    /// Every request fails as if the backend were unreachable.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Stream that yields `chunks` and then ends cleanly.
    pub fn streaming<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: Some(chunks.into_iter().map(|c| Ok(c.into())).collect()),
            ..Self::default()
        }
    }

    /// Append a transport failure after the scripted chunks.
    pub fn then_fail(mut self, error: impl Into<String>) -> Self {
        self.chunks.get_or_insert_with(Vec::new).push(Err(error.into()));
        self
    }

    /// Never end the stream after the scripted chunks.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// `stream_generate` never resolves.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// Single-shot reply envelope.
    pub fn with_reply(mut self, reply: Value) -> Self {
        self.reply = Some(reply);
        self
    }

    fn unreachable_error() -> UpstreamError {
        UpstreamError::Status {
            status: 503,
            body: "scripted backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn stream_generate(&self, _prompt: &str) -> Result<ByteStream, UpstreamError> {
        if self.silent {
            return futures_util::future::pending().await;
        }
        let chunks = self.chunks.clone().ok_or_else(Self::unreachable_error)?;
        let scripted = futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map_err(UpstreamError::Transport)),
        );

        if self.hang {
            Ok(scripted.chain(futures_util::stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn generate(&self, _prompt: &str) -> Result<Value, UpstreamError> {
        self.reply.clone().ok_or_else(Self::unreachable_error)
    }
}
