//! Per-stream subscriber registry and fan-out.

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

use finishpix_core::types::DbId;
use uuid::Uuid;

use crate::messages::ProgressEvent;

/// Channel sender half for pushing frames to one subscriber.
type EventSender = mpsc::UnboundedSender<ProgressEvent>;

/// What a subscriber is listening to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// A batch upload session.
    Session(Uuid),
    /// An event's live-mode feed.
    Live(DbId),
}

/// Fan-out point between the tracker and connected stream clients.
///
/// Holds one sender list per active key. Thread-safe via interior
/// locking; designed to be wrapped in `Arc` and shared across the
/// application.
pub struct ProgressHub {
    channels: Mutex<HashMap<StreamKey, Vec<EventSender>>>,
}

impl ProgressHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber for `key`.
    ///
    /// The caller supplies the `init` frame (normally built from a
    /// tracker snapshot); it is pushed into the channel before the
    /// sender is registered, so the subscriber always sees the snapshot
    /// first and then every later publish in order, with no gap in
    /// between.
    pub async fn subscribe(
        &self,
        key: StreamKey,
        init: ProgressEvent,
    ) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(init);

        let mut channels = self.channels.lock().await;
        channels.entry(key).or_default().push(tx);
        tracing::debug!(?key, subscribers = channels[&key].len(), "stream subscriber attached");
        rx
    }

    /// Broadcast `event` to every subscriber of `key`.
    ///
    /// Senders whose receiver is gone are dropped immediately rather
    /// than retried; when the last one goes, the key is removed. A dead
    /// subscriber therefore never blocks the tracker or its neighbours.
    pub async fn publish(&self, key: StreamKey, event: ProgressEvent) {
        let mut channels = self.channels.lock().await;
        if let Some(senders) = channels.get_mut(&key) {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
            if senders.is_empty() {
                channels.remove(&key);
            }
        }
    }

    /// Number of live subscribers for `key`.
    pub async fn subscriber_count(&self, key: StreamKey) -> usize {
        self.channels
            .lock()
            .await
            .get(&key)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
