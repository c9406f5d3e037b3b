// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation backend for deterministic testing.
//!
//! `MockBackend` implements `GenerationBackend` with pre-configured scripts,
//! enabling fast, CI-runnable tests without a model server.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::{Mutex, Notify};

use genrelay_core::{EventStream, GenerationBackend, GenerationEvent, HealthStatus, RelayError};

/// What the backend does for one call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Yield these items in order, then end. `Err` items become upstream errors.
    Events(Vec<Result<GenerationEvent, String>>),
    /// Fail the call before any event is produced.
    Fail(String),
    /// Yield these fragments, then stay silent until the stream is dropped.
    Hang(Vec<String>),
}

impl Script {
    /// Fragments for each piece of `parts` followed by an empty final event.
    pub fn text(parts: &[&str]) -> Self {
        let mut events: Vec<Result<GenerationEvent, String>> = parts
            .iter()
            .map(|p| Ok(GenerationEvent::fragment(*p)))
            .collect();
        events.push(Ok(GenerationEvent::last("")));
        Self::Events(events)
    }
}

/// A mock backend that replays scripts from a FIFO queue.
///
/// When the queue is empty, a single final event with the text
/// "mock response" is produced.
pub struct MockBackend {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    calls: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    drop_notify: Arc<Notify>,
    health: HealthStatus,
}

impl MockBackend {
    /// Create a mock backend with an empty script queue.
    pub fn new() -> Self {
        Self::with_scripts(Vec::new())
    }

    /// Create a mock backend pre-loaded with the given scripts.
    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            calls: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicUsize::new(0)),
            drop_notify: Arc::new(Notify::new()),
            health: HealthStatus::Healthy,
        }
    }

    /// Report `status` from health checks.
    pub fn with_health(mut self, status: HealthStatus) -> Self {
        self.health = status;
        self
    }

    /// Number of `complete` and `stream` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of event streams that have been dropped.
    pub fn streams_dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` event streams have been dropped.
    ///
    /// Returns false if that did not happen within `timeout`.
    pub async fn wait_for_drops(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            while self.streams_dropped() < count {
                self.drop_notify.notified().await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    async fn next_script(&self) -> Script {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::Events(vec![Ok(GenerationEvent::last("mock response"))]))
    }

    fn guard(&self) -> DropGuard {
        DropGuard {
            dropped: Arc::clone(&self.dropped),
            notify: Arc::clone(&self.drop_notify),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct DropGuard {
    dropped: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, RelayError> {
        match self.next_script().await {
            Script::Events(items) => {
                let mut text = String::new();
                for item in items {
                    let event = item.map_err(RelayError::upstream)?;
                    text.push_str(&event.text);
                }
                Ok(text)
            }
            Script::Fail(message) => Err(RelayError::upstream(message)),
            Script::Hang(_) => {
                std::future::pending::<()>().await;
                Err(RelayError::Internal("unreachable".into()))
            }
        }
    }

    async fn stream(&self, _prompt: &str) -> Result<EventStream, RelayError> {
        let events = match self.next_script().await {
            Script::Events(items) => stream::iter(
                items
                    .into_iter()
                    .map(|item| item.map_err(RelayError::upstream)),
            )
            .boxed(),
            Script::Fail(message) => return Err(RelayError::upstream(message)),
            Script::Hang(fragments) => stream::iter(
                fragments
                    .into_iter()
                    .map(|f| Ok(GenerationEvent::fragment(f))),
            )
            .chain(stream::pending())
            .boxed(),
        };

        let guard = self.guard();
        Ok(Box::pin(events.map(move |item| {
            let _ = &guard;
            item
        })))
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(self.health.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_script_when_queue_empty() {
        let backend = MockBackend::new();
        assert_eq!(backend.complete("p").await.unwrap(), "mock response");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn scripts_replayed_in_order() {
        let backend = MockBackend::with_scripts(vec![
            Script::text(&["a", "b"]),
            Script::Fail("down".into()),
        ]);

        let events: Vec<_> = backend.stream("p").await.unwrap().collect().await;
        let texts: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            texts,
            vec![
                GenerationEvent::fragment("a"),
                GenerationEvent::fragment("b"),
                GenerationEvent::last(""),
            ]
        );

        let err = match backend.stream("p").await {
            Ok(_) => panic!("expected failure"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("down"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn complete_surfaces_mid_stream_error() {
        let backend = MockBackend::with_scripts(vec![Script::Events(vec![
            Ok(GenerationEvent::fragment("x")),
            Err("broken".into()),
        ])]);
        let err = backend.complete("p").await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn hanging_stream_reports_drop() {
        let backend = MockBackend::with_scripts(vec![Script::Hang(vec!["first".into()])]);
        let mut events = backend.stream("p").await.unwrap();
        assert_eq!(events.next().await.unwrap().unwrap().text, "first");
        assert_eq!(backend.streams_dropped(), 0);

        drop(events);
        assert!(backend.wait_for_drops(1, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn health_is_configurable() {
        let backend = MockBackend::new().with_health(HealthStatus::Unhealthy("off".into()));
        assert_eq!(
            backend.health_check().await.unwrap(),
            HealthStatus::Unhealthy("off".into())
        );
    }
}
