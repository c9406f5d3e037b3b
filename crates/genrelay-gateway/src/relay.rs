// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request stream relay.
//!
//! A [`RelaySession`] couples a spawned producer task, which drives the
//! backend's event stream, with the consumer side that turns
//! [`RelayFrame`]s into Server-Sent Events. The two halves share only a
//! bounded channel and a cancellation token:
//!
//! ```text
//! backend ──events──▶ producer ──mpsc(RelayFrame)──▶ RelaySession ──▶ SSE body
//!                        ▲                                 │
//!                        └──────── CancellationToken ◀─────┘ (drop guard)
//! ```
//!
//! SSE wire format:
//! ```text
//! data: {"response":"Hel"}
//!
//! data: {"response":"upstream error: ..."}
//!
//! data: [DONE]
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use genrelay_core::{GenerationBackend, RelayFrame, RelayState};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, info, info_span, warn};

/// Payload of the terminal SSE message.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Consumer half of one streamed request.
///
/// Dropping the session cancels its producer, which in turn drops the
/// upstream request.
pub struct RelaySession {
    id: String,
    frames: mpsc::Receiver<RelayFrame>,
    state: RelayState,
    _cancel: DropGuard,
}

impl RelaySession {
    /// Spawns the producer for `prompt` and returns the consumer half.
    ///
    /// The producer's token is a child of `shutdown`, so cancelling
    /// `shutdown` ends every live session.
    pub fn start(
        backend: Arc<dyn GenerationBackend>,
        prompt: String,
        capacity: usize,
        shutdown: &CancellationToken,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let token = shutdown.child_token();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let span = info_span!("relay", session_id = %id, backend = backend.name());
        tokio::spawn(produce(backend, prompt, tx, token.clone()).instrument(span));

        Self {
            id,
            frames: rx,
            state: RelayState::Open,
            _cancel: token.drop_guard(),
        }
    }

    /// Session identifier used in log spans.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current relay state.
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Awaits the next frame to deliver.
    ///
    /// A closed channel is reported as [`RelayFrame::Done`]. Once `Done` has
    /// been returned, every further call returns `None` without waiting.
    pub async fn next_frame(&mut self) -> Option<RelayFrame> {
        if self.state == RelayState::Done {
            return None;
        }
        match self.frames.recv().await {
            Some(RelayFrame::Done) | None => {
                self.state = RelayState::Done;
                self.frames.close();
                Some(RelayFrame::Done)
            }
            Some(RelayFrame::Error(message)) => {
                warn!(session_id = %self.id, %message, "relaying upstream failure to client");
                Some(RelayFrame::Error(message))
            }
            Some(frame) => Some(frame),
        }
    }

    /// Converts the session into an SSE event stream that ends after `[DONE]`.
    pub fn into_events(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let frame = session.next_frame().await?;
            Some((Ok(frame_event(&frame)), session))
        })
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        debug!(session_id = %self.id, state = %self.state, "relay session closed");
    }
}

/// Formats one frame as an SSE event.
///
/// Errors share the fragment payload shape, so clients that only read
/// `response` still show the failure text.
pub fn frame_event(frame: &RelayFrame) -> Event {
    match frame {
        RelayFrame::Fragment(text) | RelayFrame::Error(text) => {
            Event::default().data(response_payload(text))
        }
        RelayFrame::Done => Event::default().data(DONE_SENTINEL),
    }
}

/// `{"response": text}` as a JSON string.
pub fn response_payload(text: &str) -> String {
    serde_json::json!({ "response": text }).to_string()
}

async fn produce(
    backend: Arc<dyn GenerationBackend>,
    prompt: String,
    tx: mpsc::Sender<RelayFrame>,
    token: CancellationToken,
) {
    tokio::select! {
        biased;
        () = token.cancelled() => debug!("relay cancelled, dropping upstream request"),
        () = pump(backend.as_ref(), &prompt, &tx) => {}
    }
}

async fn pump(backend: &dyn GenerationBackend, prompt: &str, tx: &mpsc::Sender<RelayFrame>) {
    let mut events = match backend.stream(prompt).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "upstream request failed");
            let _ = tx.send(RelayFrame::Error(e.to_string())).await;
            return;
        }
    };

    let mut fragments = 0u64;
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                if !event.text.is_empty() {
                    if tx.send(RelayFrame::Fragment(event.text)).await.is_err() {
                        debug!(fragments, "client went away");
                        return;
                    }
                    fragments += 1;
                }
                if event.is_final {
                    let _ = tx.send(RelayFrame::Done).await;
                    info!(fragments, "generation complete");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, fragments, "upstream stream failed");
                let _ = tx.send(RelayFrame::Error(e.to_string())).await;
                return;
            }
        }
    }
    info!(fragments, "upstream ended without final marker");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use genrelay_core::GenerationEvent;
    use genrelay_test_utils::{MockBackend, Script};

    fn start(backend: &Arc<MockBackend>, capacity: usize) -> (RelaySession, CancellationToken) {
        let shutdown = CancellationToken::new();
        let session = RelaySession::start(
            Arc::clone(backend) as Arc<dyn GenerationBackend>,
            "prompt".into(),
            capacity,
            &shutdown,
        );
        (session, shutdown)
    }

    async fn drain(session: &mut RelaySession) -> Vec<RelayFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = session.next_frame().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn relays_fragments_then_done() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Events(vec![
            Ok(GenerationEvent::fragment("Hel")),
            Ok(GenerationEvent::last("lo")),
        ])]));
        let (mut session, _shutdown) = start(&backend, 8);

        assert_eq!(session.state(), RelayState::Open);
        let frames = drain(&mut session).await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::Fragment("Hel".into()),
                RelayFrame::Fragment("lo".into()),
                RelayFrame::Done,
            ]
        );
        assert_eq!(session.state(), RelayState::Done);
    }

    #[tokio::test]
    async fn done_is_idempotent() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::text(&["x"])]));
        let (mut session, _shutdown) = start(&backend, 8);

        drain(&mut session).await;
        assert!(session.next_frame().await.is_none());
        assert!(session.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn failure_before_any_event_yields_one_error_then_done() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Fail(
            "could not reach backend".into(),
        )]));
        let (mut session, _shutdown) = start(&backend, 8);

        let frames = drain(&mut session).await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            RelayFrame::Error(msg) => assert!(msg.contains("could not reach backend")),
            other => panic!("expected error frame, got {other:?}"),
        }
        assert_eq!(frames[1], RelayFrame::Done);
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_earlier_fragments() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Events(vec![
            Ok(GenerationEvent::fragment("par")),
            Err("connection reset".into()),
            Ok(GenerationEvent::fragment("never")),
        ])]));
        let (mut session, _shutdown) = start(&backend, 8);

        let frames = drain(&mut session).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], RelayFrame::Fragment("par".into()));
        assert!(matches!(&frames[1], RelayFrame::Error(m) if m.contains("connection reset")));
        assert_eq!(frames[2], RelayFrame::Done);
    }

    #[tokio::test]
    async fn stream_end_without_final_is_normal_closure() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Events(vec![
            Ok(GenerationEvent::fragment("a")),
            Ok(GenerationEvent::fragment("b")),
        ])]));
        let (mut session, _shutdown) = start(&backend, 8);

        let frames = drain(&mut session).await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::Fragment("a".into()),
                RelayFrame::Fragment("b".into()),
                RelayFrame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn order_preserved_under_backpressure() {
        let parts: Vec<String> = (0..200).map(|i| format!("{i},")).collect();
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::text(&refs)]));
        let (mut session, _shutdown) = start(&backend, 1);

        let mut text = String::new();
        while let Some(frame) = session.next_frame().await {
            match frame {
                RelayFrame::Fragment(t) => text.push_str(&t),
                RelayFrame::Done => break,
                RelayFrame::Error(e) => panic!("unexpected error frame: {e}"),
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(text, parts.concat());
    }

    #[tokio::test]
    async fn dropping_session_cancels_producer() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Hang(vec![
            "first".into(),
        ])]));
        let (mut session, _shutdown) = start(&backend, 8);

        assert_eq!(
            session.next_frame().await,
            Some(RelayFrame::Fragment("first".into()))
        );
        drop(session);

        assert!(
            backend.wait_for_drops(1, Duration::from_secs(2)).await,
            "upstream stream was not dropped after client disconnect"
        );
    }

    #[tokio::test]
    async fn shutdown_token_ends_live_sessions() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::Hang(vec![
            "first".into(),
        ])]));
        let (mut session, shutdown) = start(&backend, 8);

        assert!(matches!(
            session.next_frame().await,
            Some(RelayFrame::Fragment(_))
        ));
        shutdown.cancel();

        let next = tokio::time::timeout(Duration::from_secs(2), session.next_frame())
            .await
            .unwrap();
        assert_eq!(next, Some(RelayFrame::Done));
        assert!(backend.wait_for_drops(1, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn event_stream_ends_after_done() {
        let backend = Arc::new(MockBackend::with_scripts(vec![Script::text(&["a", "b"])]));
        let (session, _shutdown) = start(&backend, 8);

        let events: Vec<_> = session.into_events().collect().await;
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn payload_escapes_text() {
        assert_eq!(response_payload("Hel"), r#"{"response":"Hel"}"#);
        assert_eq!(
            response_payload("line\n\"quoted\""),
            r#"{"response":"line\n\"quoted\""}"#
        );
    }
}
