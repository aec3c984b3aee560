//! Per-request relay loop.
//!
//! A [`RelaySession`] owns everything one request needs (decoder buffer, event
//! counters) and runs on its own task, talking to the HTTP body through a
//! bounded channel. Nothing here is shared across requests.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::Instrument;

use super::{sanitize, RelayEvent, STATUS_STEPS};
use crate::lexicon::Lexicon;
use crate::upstream::sse::SseDecoder;
use crate::upstream::{ByteStream, TextGenerator, UpstreamError};

/// Events buffered between the session task and a slow client.
pub const EVENT_BUFFER: usize = 16;

/// How a session ended. `Done` is sent for every outcome except `ClientGone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Upstream closed the stream normally.
    Completed,
    /// Upstream could not be reached or rejected the request.
    UpstreamUnavailable,
    /// Upstream broke after streaming began.
    UpstreamFailed,
    /// Upstream went silent for longer than the idle timeout.
    IdleTimeout,
    /// Client disconnected; upstream was released without finishing.
    ClientGone,
}

pub struct RelaySession {
    id: String,
    lexicon: Arc<Lexicon>,
    idle_timeout: Duration,
    decoder: SseDecoder,
    sent: usize,
    fragments: usize,
}

impl RelaySession {
    pub fn new(id: impl Into<String>, lexicon: Arc<Lexicon>, idle_timeout: Duration) -> Self {
        Self {
            id: id.into(),
            lexicon,
            idle_timeout,
            decoder: SseDecoder::new(),
            sent: 0,
            fragments: 0,
        }
    }

    /// Drive one session to completion, sending events to `tx`.
    pub async fn run(
        mut self,
        generator: Arc<dyn TextGenerator>,
        prompt: String,
        tx: mpsc::Sender<RelayEvent>,
    ) -> SessionOutcome {
        let outcome = self.relay(generator.as_ref(), &prompt, &tx).await;

        if outcome != SessionOutcome::ClientGone && self.send(&tx, RelayEvent::Done).await.is_err() {
            tracing::debug!(session = %self.id, "client left before done");
        }

        tracing::info!(
            session = %self.id,
            outcome = ?outcome,
            fragments = self.fragments,
            events = self.sent,
            malformed = self.decoder.malformed(),
            "relay session finished"
        );
        outcome
    }

    async fn relay(
        &mut self,
        generator: &dyn TextGenerator,
        prompt: &str,
        tx: &mpsc::Sender<RelayEvent>,
    ) -> SessionOutcome {
        for (step, msg) in STATUS_STEPS {
            if self.send(tx, RelayEvent::status(step, msg)).await.is_err() {
                return SessionOutcome::ClientGone;
            }
        }

        // Waiting for response headers counts against the idle timeout too.
        let opened = tokio::select! {
            _ = tx.closed() => return SessionOutcome::ClientGone,
            opened = tokio::time::timeout(self.idle_timeout, generator.stream_generate(prompt)) => opened,
        };

        match opened {
            Ok(Ok(bytes)) => self.pump(bytes, tx).await,
            Ok(Err(e)) => {
                tracing::warn!(session = %self.id, error = %e, "upstream unavailable, ending without content");
                SessionOutcome::UpstreamUnavailable
            }
            Err(_) => {
                let e = UpstreamError::IdleTimeout(self.idle_timeout);
                tracing::warn!(session = %self.id, error = %e, "upstream never answered, ending without content");
                SessionOutcome::IdleTimeout
            }
        }
    }

    /// Read until the upstream ends, fails, goes idle, or the client leaves.
    /// Dropping `bytes` on return releases the upstream connection.
    async fn pump(&mut self, mut bytes: ByteStream, tx: &mpsc::Sender<RelayEvent>) -> SessionOutcome {
        let outcome = 'read: loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => break 'read SessionOutcome::ClientGone,
                next = tokio::time::timeout(self.idle_timeout, bytes.next()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(None) => break 'read SessionOutcome::Completed,
                Ok(Some(Err(e))) => {
                    tracing::warn!(session = %self.id, error = %e, "upstream failed mid-stream");
                    break 'read SessionOutcome::UpstreamFailed;
                }
                Err(_) => {
                    let e = UpstreamError::IdleTimeout(self.idle_timeout);
                    tracing::warn!(session = %self.id, error = %e, "upstream idle, ending session");
                    break 'read SessionOutcome::IdleTimeout;
                }
            };

            for envelope in self.decoder.feed(&chunk) {
                let Some(text) = sanitize::fragment(&self.lexicon, &envelope) else {
                    continue;
                };
                self.fragments += 1;
                if self.send(tx, RelayEvent::Content { data: text }).await.is_err() {
                    break 'read SessionOutcome::ClientGone;
                }
            }
        };

        self.decoder.finish();
        if outcome == SessionOutcome::ClientGone {
            tracing::info!(session = %self.id, "client disconnected, releasing upstream");
        }
        outcome
    }

    async fn send(
        &mut self,
        tx: &mpsc::Sender<RelayEvent>,
        event: RelayEvent,
    ) -> Result<(), mpsc::error::SendError<RelayEvent>> {
        tx.send(event).await?;
        self.sent += 1;
        Ok(())
    }
}

/// Start a session on its own task and return the receiving end of its events.
pub fn spawn_session(
    session: RelaySession,
    generator: Arc<dyn TextGenerator>,
    prompt: String,
) -> mpsc::Receiver<RelayEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let span = tracing::info_span!("relay", session = %session.id);
    tokio::spawn(session.run(generator, prompt, tx).instrument(span));
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::ScriptedGenerator;

    fn frame(text: &str) -> String {
        let envelope = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        });
        format!("data: {}\r\n\r\n", envelope)
    }

    fn session() -> RelaySession {
        RelaySession::new("test", Arc::new(Lexicon::default()), Duration::from_secs(5))
    }

    async fn collect(generator: ScriptedGenerator) -> (Vec<RelayEvent>, SessionOutcome) {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(session().run(Arc::new(generator), "prompt".into(), tx));
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, handle.await.unwrap())
    }

    fn assert_framed(events: &[RelayEvent]) {
        assert!(matches!(events[0], RelayEvent::Status { step: 1, .. }));
        assert!(matches!(events[1], RelayEvent::Status { step: 2, .. }));
        assert_eq!(events.last(), Some(&RelayEvent::Done));
        assert_eq!(events.iter().filter(|e| **e == RelayEvent::Done).count(), 1);
    }

    fn contents(events: &[RelayEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                RelayEvent::Content { data } => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn relays_fragments_in_order() {
        let body = format!("{}{}{}", frame("하나"), frame(r"둘\n셋"), "data: [DONE]\n");
        let (events, outcome) = collect(ScriptedGenerator::streaming([body])).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["하나", "둘<br>셋"]);
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_change_output() {
        let body = format!("{}{}{}", frame("가나다"), frame("라마"), frame("바사"));
        let bytes = body.into_bytes();
        let pieces: Vec<Vec<u8>> = bytes.chunks(5).map(|c| c.to_vec()).collect();

        let (whole, _) = collect(ScriptedGenerator::streaming([bytes.clone()])).await;
        let (split, _) = collect(ScriptedGenerator::streaming(pieces)).await;
        assert_eq!(whole, split);
        assert_eq!(contents(&split), vec!["가나다", "라마", "바사"]);
    }

    #[tokio::test]
    async fn unavailable_upstream_sends_status_then_done() {
        let (events, outcome) = collect(ScriptedGenerator::unavailable()).await;

        assert_eq!(outcome, SessionOutcome::UpstreamUnavailable);
        assert_eq!(events.len(), 3);
        assert_framed(&events);
    }

    #[tokio::test]
    async fn mid_stream_failure_still_ends_with_done() {
        let generator = ScriptedGenerator::streaming([frame("앞부분")]).then_fail("connection reset");
        let (events, outcome) = collect(generator).await;

        assert_eq!(outcome, SessionOutcome::UpstreamFailed);
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["앞부분"]);
    }

    #[tokio::test]
    async fn trailing_partial_line_is_discarded() {
        let body = format!("{}data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"끝\"}}]}}}}]}}", frame("완성"));
        let (events, outcome) = collect(ScriptedGenerator::streaming([body])).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(contents(&events), vec!["완성"]);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let body = format!("data: {{oops\n{}data: [DONE]\n", frame("정상"));
        let (events, outcome) = collect(ScriptedGenerator::streaming([body])).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["정상"]);
    }

    #[tokio::test]
    async fn empty_stream_sends_status_then_done() {
        let (events, outcome) = collect(ScriptedGenerator::streaming(Vec::<Vec<u8>>::new())).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(events.len(), 3);
        assert_framed(&events);
    }

    #[tokio::test]
    async fn idle_upstream_times_out() {
        let generator = Arc::new(ScriptedGenerator::streaming([frame("시작")]).then_hang());
        let session = RelaySession::new("idle", Arc::new(Lexicon::default()), Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(session.run(generator, "p".into(), tx));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(handle.await.unwrap(), SessionOutcome::IdleTimeout);
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["시작"]);
    }

    #[tokio::test]
    async fn silent_upstream_open_times_out() {
        let session = RelaySession::new("silent", Arc::new(Lexicon::default()), Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(session.run(Arc::new(ScriptedGenerator::silent()), "p".into(), tx));

        let mut events = Vec::new();
        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
        })
        .await;

        assert!(drained.is_ok(), "session must end on its own");
        assert_eq!(handle.await.unwrap(), SessionOutcome::IdleTimeout);
        assert_eq!(events.len(), 3);
        assert_framed(&events);
    }

    #[tokio::test]
    async fn stalled_session_does_not_block_another() {
        let stalled: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::streaming([frame("멈춤")]).then_hang());
        let healthy: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::streaming([frame("진행")]));

        let mut stalled_rx = spawn_session(session(), stalled, "p".into());
        let mut healthy_rx = spawn_session(session(), healthy, "p".into());

        // Stalled session gets as far as its content, then waits on upstream.
        for _ in 0..3 {
            assert!(stalled_rx.recv().await.is_some());
        }

        let mut events = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = healthy_rx.recv().await {
                events.push(event);
            }
        })
        .await
        .expect("healthy session finishes while the other is stalled");
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["진행"]);

        assert!(stalled_rx.try_recv().is_err(), "stalled session has not finished");
    }

    #[tokio::test]
    async fn client_disconnect_stops_reading() {
        let generator = Arc::new(ScriptedGenerator::streaming([frame("첫")]).then_hang());
        let session = RelaySession::new("gone", Arc::new(Lexicon::default()), Duration::from_secs(3600));
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(session.run(generator, "p".into(), tx));

        // Read the status events, then hang up mid-stream.
        assert!(matches!(rx.recv().await, Some(RelayEvent::Status { step: 1, .. })));
        drop(rx);

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("session should stop once the client is gone")
            .unwrap();
        assert_eq!(outcome, SessionOutcome::ClientGone);
    }

    #[tokio::test]
    async fn spawned_session_streams_to_receiver() {
        let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::streaming([frame("스폰")]));
        let mut rx = spawn_session(session(), generator, "p".into());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_framed(&events);
        assert_eq!(contents(&events), vec!["스폰"]);
    }
}
