//! The unit of work handed to the worker pool.

use uuid::Uuid;

use finishpix_core::credits::ProcessingTier;
use finishpix_core::types::DbId;
use finishpix_events::StreamKey;
use finishpix_vision::OcrEngine;

/// Where a photo's progress frames go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKey {
    /// A batch upload session.
    Session(Uuid),
    /// The photo's event live feed.
    Live,
}

/// One photo to push through the pipeline.
///
/// Built by the upload handlers at submission time; everything else
/// about the photo is loaded from its row when the job runs.
#[derive(Debug, Clone)]
pub struct PhotoJob {
    pub photo_id: DbId,
    pub event_id: DbId,
    pub uploader_user_id: DbId,
    pub file_name: String,
    pub tier: ProcessingTier,
    pub ocr_engine: OcrEngine,
    pub progress: ProgressKey,
}

impl PhotoJob {
    /// The hub key this job publishes to.
    pub fn stream_key(&self) -> StreamKey {
        match self.progress {
            ProgressKey::Session(session_id) => StreamKey::Session(session_id),
            ProgressKey::Live => StreamKey::Live(self.event_id),
        }
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_jobs_stream_to_their_event() {
        let job = PhotoJob {
            photo_id: 3,
            event_id: 7,
            uploader_user_id: 1,
            file_name: "a.jpg".to_string(),
            tier: ProcessingTier::Premium,
            ocr_engine: OcrEngine::Cloud,
            progress: ProgressKey::Live,
        };
        assert_eq!(job.stream_key(), StreamKey::Live(7));
    }

    #[test]
    fn session_jobs_stream_to_their_session() {
        let session_id = Uuid::now_v7();
        let job = PhotoJob {
            photo_id: 3,
            event_id: 7,
            uploader_user_id: 1,
            file_name: "a.jpg".to_string(),
            tier: ProcessingTier::Standard,
            ocr_engine: OcrEngine::Local,
            progress: ProgressKey::Session(session_id),
        };
        assert_eq!(job.stream_key(), StreamKey::Session(session_id));
    }
}
