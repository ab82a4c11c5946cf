//! Progress events and their live delivery
//!
//! Progress is fire-and-forget: events flow one way from the crawler and the
//! snapshot writer to whoever subscribed under a progress id. Nothing is
//! buffered for late subscribers, and a vanished subscriber never stops a
//! capture.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Pipeline phase a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Crawl,
    Save,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawl => write!(f, "crawl"),
            Self::Save => write!(f, "save"),
        }
    }
}

/// One step of pipeline advancement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub page_count: usize,
    pub total: usize,
    pub url: String,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, page_count: usize, total: usize, url: impl Into<String>) -> Self {
        Self {
            phase,
            page_count,
            total,
            url: url.into(),
        }
    }
}

/// Destination for progress events
///
/// Implementations must not block and must swallow delivery failures.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Process-wide map from progress id to an open delivery channel
///
/// Entries are added by [`subscribe`](Self::subscribe) and removed by
/// [`unsubscribe`](Self::unsubscribe), which the pipeline calls once a
/// capture ends. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    channels: Arc<Mutex<HashMap<String, UnboundedSender<ProgressEvent>>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a channel for `progress_id`, replacing any previous subscriber
    pub fn subscribe(&self, progress_id: &str) -> UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = unbounded_channel();
        if let Ok(mut channels) = self.channels.lock() {
            channels.insert(progress_id.to_string(), tx);
        }
        rx
    }

    /// Drops the channel for `progress_id`, ending the subscriber's stream
    pub fn unsubscribe(&self, progress_id: &str) {
        if let Ok(mut channels) = self.channels.lock() {
            channels.remove(progress_id);
        }
    }

    /// Delivers an event to the subscriber of `progress_id`, if any
    ///
    /// A closed receiver is treated as a disconnect and its entry removed.
    pub fn publish(&self, progress_id: &str, event: ProgressEvent) {
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };

        let disconnected = match channels.get(progress_id) {
            Some(tx) => tx.send(event).is_err(),
            None => false,
        };

        if disconnected {
            tracing::debug!("Progress subscriber {} disconnected", progress_id);
            channels.remove(progress_id);
        }
    }

    /// Returns true if a subscriber is registered for `progress_id`
    pub fn is_subscribed(&self, progress_id: &str) -> bool {
        self.channels
            .lock()
            .map(|channels| channels.contains_key(progress_id))
            .unwrap_or(false)
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.channels.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a sink that publishes under `progress_id`
    pub fn publisher(&self, progress_id: impl Into<String>) -> ProgressPublisher {
        ProgressPublisher {
            registry: self.clone(),
            progress_id: progress_id.into(),
        }
    }
}

/// [`ProgressSink`] bound to one progress id of a [`ProgressRegistry`]
#[derive(Debug, Clone)]
pub struct ProgressPublisher {
    registry: ProgressRegistry,
    progress_id: String,
}

impl ProgressSink for ProgressPublisher {
    fn emit(&self, event: ProgressEvent) {
        self.registry.publish(&self.progress_id, event);
    }
}
