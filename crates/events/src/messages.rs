//! Wire format for progress streams.
//!
//! Every frame a stream subscriber sees is one [`ProgressEvent`],
//! serialized as JSON with a `type` tag. Clients switch on exactly four
//! families: `init`, `photo_received`, `photo_processed`, `photo_error`.

use serde::Serialize;

use finishpix_core::types::{DbId, Timestamp};

/// One frame on a progress stream.
///
/// Batch-session streams carry `total`/`complete` on per-photo frames;
/// live streams have no preset total, so those fields are omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// First frame on every stream: the tracker's state at attach time.
    Init {
        #[serde(flatten)]
        snapshot: Snapshot,
    },

    /// Live mode only: a photo arrived and was queued for processing.
    PhotoReceived {
        photo_id: DbId,
        file_name: String,
        received: u32,
    },

    /// A photo finished the pipeline.
    PhotoProcessed {
        photo_id: DbId,
        file_name: String,
        bib_numbers: Vec<String>,
        processed: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        complete: Option<bool>,
    },

    /// A photo failed the pipeline.
    PhotoError {
        photo_id: DbId,
        file_name: String,
        error: String,
        processed: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        complete: Option<bool>,
    },
}

/// State carried by an `init` frame; flattened into the frame body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Session(SessionSnapshot),
    Live(LiveSnapshot),
}

/// Point-in-time view of a batch upload session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub event_id: DbId,
    pub total: u32,
    pub processed: u32,
    pub current_step: Option<String>,
    pub credits_refunded: u32,
    pub complete: bool,
}

/// Point-in-time view of an event's live-mode activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveSnapshot {
    pub received: u32,
    pub processed: u32,
    /// Most recent photo outcomes, newest last, at most
    /// [`RECENT_CAPACITY`](crate::tracker::RECENT_CAPACITY) entries.
    pub recent: Vec<RecentPhoto>,
    pub active: bool,
}

/// One entry in the live recent-activity ring.
#[derive(Debug, Clone, Serialize)]
pub struct RecentPhoto {
    pub photo_id: DbId,
    pub file_name: String,
    pub bib_numbers: Vec<String>,
    pub ok: bool,
    pub at: Timestamp,
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_flattens_the_session_snapshot() {
        let event = ProgressEvent::Init {
            snapshot: Snapshot::Session(SessionSnapshot {
                event_id: 9,
                total: 12,
                processed: 3,
                current_step: Some("Detecting bib numbers".to_string()),
                credits_refunded: 0,
                complete: false,
            }),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["total"], 12);
        assert_eq!(json["processed"], 3);
        assert_eq!(json["current_step"], "Detecting bib numbers");
        assert_eq!(json["complete"], false);
    }

    #[test]
    fn init_flattens_the_live_snapshot() {
        let event = ProgressEvent::Init {
            snapshot: Snapshot::Live(LiveSnapshot {
                received: 5,
                processed: 4,
                recent: vec![RecentPhoto {
                    photo_id: 31,
                    file_name: "finish.jpg".to_string(),
                    bib_numbers: vec!["4102".to_string()],
                    ok: true,
                    at: chrono::Utc::now(),
                }],
                active: true,
            }),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["received"], 5);
        assert_eq!(json["recent"][0]["photo_id"], 31);
        assert_eq!(json["recent"][0]["bib_numbers"][0], "4102");
        assert_eq!(json["active"], true);
    }

    #[test]
    fn session_photo_processed_carries_totals() {
        let event = ProgressEvent::PhotoProcessed {
            photo_id: 7,
            file_name: "a.jpg".to_string(),
            bib_numbers: vec!["88".to_string()],
            processed: 10,
            total: Some(10),
            complete: Some(true),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "photo_processed");
        assert_eq!(json["total"], 10);
        assert_eq!(json["complete"], true);
    }

    #[test]
    fn live_frames_omit_total_and_complete() {
        let event = ProgressEvent::PhotoProcessed {
            photo_id: 7,
            file_name: "a.jpg".to_string(),
            bib_numbers: Vec::new(),
            processed: 2,
            total: None,
            complete: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "photo_processed");
        assert!(json.get("total").is_none());
        assert!(json.get("complete").is_none());
    }

    #[test]
    fn photo_error_is_its_own_family() {
        let event = ProgressEvent::PhotoError {
            photo_id: 3,
            file_name: "b.jpg".to_string(),
            error: "ocr unavailable".to_string(),
            processed: 1,
            total: Some(4),
            complete: Some(false),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "photo_error");
        assert_eq!(json["error"], "ocr unavailable");
    }

    #[test]
    fn photo_received_serializes_snake_case_tag() {
        let event = ProgressEvent::PhotoReceived {
            photo_id: 1,
            file_name: "c.jpg".to_string(),
            received: 6,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "photo_received");
        assert_eq!(json["received"], 6);
    }
}
