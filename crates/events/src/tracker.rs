//! Upload progress state, batch and live.
//!
//! The tracker is the only writer of progress state. Every mutation
//! publishes the matching [`ProgressEvent`] through the hub while the
//! state lock is still held, so the frames on a stream always appear in
//! counter order even under parallel pipeline workers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use finishpix_core::types::{DbId, Timestamp};

use crate::hub::{ProgressHub, StreamKey};
use crate::messages::{LiveSnapshot, ProgressEvent, RecentPhoto, SessionSnapshot, Snapshot};

/// Capacity of the live recent-activity ring.
pub const RECENT_CAPACITY: usize = 20;

/// A batch upload session. Exists from submission until the retention
/// sweep drops it after completion.
struct UploadSession {
    event_id: DbId,
    total: u32,
    processed: u32,
    current_step: Option<String>,
    credits_refunded: u32,
    complete: bool,
    completed_at: Option<Timestamp>,
}

/// Live-mode counters for one event. Created on the first received
/// photo; `active` is true for as long as the entry exists.
struct LiveUploadStatus {
    received: u32,
    processed: u32,
    recent: VecDeque<RecentPhoto>,
}

impl LiveUploadStatus {
    fn new() -> Self {
        Self {
            received: 0,
            processed: 0,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    /// Append an outcome, evicting the oldest entry past capacity.
    fn push_recent(&mut self, entry: RecentPhoto) {
        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(entry);
    }
}

/// Tracks every in-flight upload session and live feed.
///
/// Thread-safe via interior `RwLock`s; designed to be wrapped in `Arc`
/// and shared between the HTTP layer and the pipeline workers.
pub struct ProgressTracker {
    sessions: RwLock<HashMap<Uuid, UploadSession>>,
    live: RwLock<HashMap<DbId, LiveUploadStatus>>,
    hub: Arc<ProgressHub>,
}

impl ProgressTracker {
    pub fn new(hub: Arc<ProgressHub>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            live: RwLock::new(HashMap::new()),
            hub,
        }
    }

    // ---- batch sessions ----

    /// Open a session for a batch of `total` photos. The UUIDv7 key is
    /// what clients poll and stream against.
    pub async fn create_session(&self, event_id: DbId, total: u32) -> Uuid {
        let session_id = Uuid::now_v7();
        let session = UploadSession {
            event_id,
            total,
            processed: 0,
            current_step: None,
            credits_refunded: 0,
            complete: false,
            completed_at: None,
        };
        self.sessions.write().await.insert(session_id, session);
        tracing::debug!(%session_id, event_id, total, "upload session created");
        session_id
    }

    /// Update the coarse step label shown while a batch runs. State
    /// only; it surfaces through snapshots, not as its own frame.
    pub async fn session_step(&self, session_id: Uuid, step: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.current_step = Some(step.to_string());
        }
    }

    /// Record one successfully processed photo and broadcast it.
    pub async fn photo_processed(
        &self,
        session_id: Uuid,
        photo_id: DbId,
        file_name: &str,
        bib_numbers: Vec<String>,
    ) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            tracing::debug!(%session_id, "progress update for unknown session");
            return;
        };
        session.advance();
        let event = ProgressEvent::PhotoProcessed {
            photo_id,
            file_name: file_name.to_string(),
            bib_numbers,
            processed: session.processed,
            total: Some(session.total),
            complete: Some(session.complete),
        };
        self.hub.publish(StreamKey::Session(session_id), event).await;
    }

    /// Record one failed photo. Failures still advance the processed
    /// count so a batch with errors reaches completion.
    pub async fn photo_failed(
        &self,
        session_id: Uuid,
        photo_id: DbId,
        file_name: &str,
        error: &str,
    ) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            tracing::debug!(%session_id, "progress update for unknown session");
            return;
        };
        session.advance();
        let event = ProgressEvent::PhotoError {
            photo_id,
            file_name: file_name.to_string(),
            error: error.to_string(),
            processed: session.processed,
            total: Some(session.total),
            complete: Some(session.complete),
        };
        self.hub.publish(StreamKey::Session(session_id), event).await;
    }

    /// Count one refunded credit against the session.
    pub async fn refund_recorded(&self, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.credits_refunded += 1;
        }
    }

    pub async fn session_snapshot(&self, session_id: Uuid) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(UploadSession::snapshot)
    }

    /// Drop completed sessions older than `max_age`. Returns how many
    /// were removed.
    pub async fn sweep_completed(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            let expired = session.complete
                && session
                    .completed_at
                    .map(|done| (now - done).to_std().map(|age| age >= max_age).unwrap_or(false))
                    .unwrap_or(false);
            !expired
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "swept completed upload sessions");
        }
        removed
    }

    // ---- live mode ----

    /// Record a live photo's arrival and broadcast it.
    pub async fn live_photo_received(&self, event_id: DbId, photo_id: DbId, file_name: &str) {
        let mut live = self.live.write().await;
        let status = live.entry(event_id).or_insert_with(LiveUploadStatus::new);
        status.received += 1;
        let event = ProgressEvent::PhotoReceived {
            photo_id,
            file_name: file_name.to_string(),
            received: status.received,
        };
        self.hub.publish(StreamKey::Live(event_id), event).await;
    }

    /// Record a live photo's completed pipeline run.
    pub async fn live_photo_processed(
        &self,
        event_id: DbId,
        photo_id: DbId,
        file_name: &str,
        bib_numbers: Vec<String>,
    ) {
        let mut live = self.live.write().await;
        let status = live.entry(event_id).or_insert_with(LiveUploadStatus::new);
        status.processed += 1;
        status.push_recent(RecentPhoto {
            photo_id,
            file_name: file_name.to_string(),
            bib_numbers: bib_numbers.clone(),
            ok: true,
            at: Utc::now(),
        });
        let event = ProgressEvent::PhotoProcessed {
            photo_id,
            file_name: file_name.to_string(),
            bib_numbers,
            processed: status.processed,
            total: None,
            complete: None,
        };
        self.hub.publish(StreamKey::Live(event_id), event).await;
    }

    /// Record a live photo's pipeline failure.
    pub async fn live_photo_failed(
        &self,
        event_id: DbId,
        photo_id: DbId,
        file_name: &str,
        error: &str,
    ) {
        let mut live = self.live.write().await;
        let status = live.entry(event_id).or_insert_with(LiveUploadStatus::new);
        status.processed += 1;
        status.push_recent(RecentPhoto {
            photo_id,
            file_name: file_name.to_string(),
            bib_numbers: Vec::new(),
            ok: false,
            at: Utc::now(),
        });
        let event = ProgressEvent::PhotoError {
            photo_id,
            file_name: file_name.to_string(),
            error: error.to_string(),
            processed: status.processed,
            total: None,
            complete: None,
        };
        self.hub.publish(StreamKey::Live(event_id), event).await;
    }

    /// Counters and ring contents for an event's live feed, if any
    /// photo has ever arrived this process lifetime.
    pub async fn live_snapshot(&self, event_id: DbId) -> Option<LiveSnapshot> {
        self.live.read().await.get(&event_id).map(|status| LiveSnapshot {
            received: status.received,
            processed: status.processed,
            recent: status.recent.iter().cloned().collect(),
            active: true,
        })
    }
}

impl UploadSession {
    /// Advance the processed counter, saturating at `total`, and flip
    /// `complete` the first time the batch fills up.
    fn advance(&mut self) {
        if self.processed < self.total {
            self.processed += 1;
        }
        if self.processed == self.total && !self.complete {
            self.complete = true;
            self.completed_at = Some(Utc::now());
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            event_id: self.event_id,
            total: self.total,
            processed: self.processed,
            current_step: self.current_step.clone(),
            credits_refunded: self.credits_refunded,
            complete: self.complete,
        }
    }
}

/// Build the `init` frame for a session stream.
pub fn session_init(snapshot: SessionSnapshot) -> ProgressEvent {
    ProgressEvent::Init {
        snapshot: Snapshot::Session(snapshot),
    }
}

/// Build the `init` frame for a live stream. Events with no live
/// activity yet get an all-zero, inactive snapshot.
pub fn live_init(snapshot: Option<LiveSnapshot>) -> ProgressEvent {
    ProgressEvent::Init {
        snapshot: Snapshot::Live(snapshot.unwrap_or_default()),
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
