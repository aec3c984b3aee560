//! Server-sent-event decoding, split into two stages.
//!
//! 1. [`LineAssembler`] turns arbitrarily cut byte chunks into complete lines.
//!    It owns the only carried-over state: bytes after the last terminator.
//! 2. [`parse_line`] turns one line into a [`Frame`].
//!
//! [`SseDecoder`] chains the two for the relay loop. Lines are split on `\n`
//! with an optional preceding `\r` removed. Bytes are buffered, not text, so a
//! multi-byte character cut in half by a chunk boundary is reassembled intact.

use serde_json::Value;

/// Field prefix of a data-bearing SSE line.
pub const DATA_PREFIX: &str = "data:";

// ═══════════════════════════════════════════════════════════════════════
//  Stage 1: bytes → lines
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Carried-over bytes never contain a terminator; only scan the new ones.
        let mut cursor = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            let mut line = &self.pending[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
            cursor = start;
        }
        self.pending.drain(..start);
        lines
    }

    /// Bytes waiting for a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End of stream: drop any unterminated tail and return its length.
    /// The buffer is cleared, keeping its allocation.
    pub fn finish(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Stage 2: line → frame
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `data:` line whose payload parsed as JSON.
    Data(Value),
    /// `data:` line whose payload is not JSON (e.g. a `[DONE]` sentinel).
    Malformed,
    /// Blank line, comment, or any other SSE field.
    Ignored,
}

pub fn parse_line(line: &str) -> Frame {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Frame::Data(value),
        Err(e) => {
            tracing::debug!(error = %e, len = payload.len(), "sse: skipping non-JSON data line");
            Frame::Malformed
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Combined decoder
// ═══════════════════════════════════════════════════════════════════════

/// Per-session decoder. Never shared between sessions.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineAssembler,
    malformed: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the envelopes it completed, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| match parse_line(line) {
                Frame::Data(value) => Some(value),
                Frame::Malformed => {
                    self.malformed += 1;
                    None
                }
                Frame::Ignored => None,
            })
            .collect()
    }

    /// Count of `data:` lines skipped because they were not JSON.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// End of stream. Returns the number of unterminated bytes discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.lines.finish();
        if discarded > 0 {
            tracing::debug!(bytes = discarded, "sse: discarding unterminated trailing data");
        }
        discarded
    }
}
