//! Outward NDJSON protocol and the session that produces it.
//!
//! - `sanitize`: envelope → cleaned text fragment
//! - `session`: per-request read/decode/sanitize/emit loop

pub mod sanitize;
pub mod session;

use bytes::Bytes;
use serde::Serialize;

pub use session::{spawn_session, RelaySession, SessionOutcome};

/// Synthetic progress markers sent before the upstream is contacted.
pub const STATUS_STEPS: [(u8, &str); 2] = [
    (1, "고객 페르소나를 분석하고 있습니다..."),
    (2, "맞춤형 콘텐츠를 생성하고 있습니다..."),
];

/// One line of the outward protocol.
///
/// Per session: both `Status` events, then zero or more `Content` events in
/// upstream order, then exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    Status { step: u8, msg: String },
    Content { data: String },
    Done,
}

impl RelayEvent {
    pub fn status(step: u8, msg: impl Into<String>) -> Self {
        RelayEvent::Status {
            step,
            msg: msg.into(),
        }
    }

    pub fn content(data: impl Into<String>) -> Self {
        RelayEvent::Content { data: data.into() }
    }

    /// Serialize as one self-contained, newline-terminated JSON line.
    pub fn to_line(&self) -> Bytes {
        let mut line = serde_json::to_vec(self).unwrap_or_else(|_| br#"{"type":"done"}"#.to_vec());
        line.push(b'\n');
        Bytes::from(line)
    }
}
