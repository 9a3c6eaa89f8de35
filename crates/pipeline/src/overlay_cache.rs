//! Caches for watermark overlays.
//!
//! Two small caches keep the watermark stage from re-rendering the same
//! overlay for every photo in a batch: rendered text overlays keyed by
//! output dimensions plus text, and the decoded custom watermark image
//! per event. The custom entry is invalidated explicitly when an
//! operator uploads or clears the event's watermark image.

use std::collections::HashMap;
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use tokio::sync::Mutex;

use finishpix_core::types::DbId;

/// Upper bound on cached rendered text overlays.
pub const OVERLAY_CACHE_CAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OverlayKey {
    width: u32,
    height: u32,
    text: String,
}

/// Shared overlay cache, one per process.
pub struct OverlayCache {
    text_overlays: Mutex<HashMap<OverlayKey, Arc<GrayImage>>>,
    custom: Mutex<HashMap<DbId, Arc<DynamicImage>>>,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self {
            text_overlays: Mutex::new(HashMap::new()),
            custom: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the rendered text overlay for the given output dimensions,
    /// rendering and caching it on a miss. At capacity an arbitrary
    /// entry is evicted first.
    ///
    /// The render runs under the cache lock, so concurrent workers
    /// never render the same overlay twice.
    pub async fn text_overlay(
        &self,
        width: u32,
        height: u32,
        text: &str,
        render: impl FnOnce() -> GrayImage,
    ) -> Arc<GrayImage> {
        let key = OverlayKey {
            width,
            height,
            text: text.to_string(),
        };
        let mut overlays = self.text_overlays.lock().await;
        if let Some(overlay) = overlays.get(&key) {
            return overlay.clone();
        }

        if overlays.len() >= OVERLAY_CACHE_CAP {
            if let Some(victim) = overlays.keys().next().cloned() {
                overlays.remove(&victim);
            }
        }

        let overlay = Arc::new(render());
        overlays.insert(key, overlay.clone());
        overlay
    }

    /// The decoded custom watermark for an event, if cached.
    pub async fn cached_custom(&self, event_id: DbId) -> Option<Arc<DynamicImage>> {
        self.custom.lock().await.get(&event_id).cloned()
    }

    /// Cache the decoded custom watermark for an event, replacing any
    /// previous entry.
    pub async fn store_custom(&self, event_id: DbId, image: DynamicImage) -> Arc<DynamicImage> {
        let image = Arc::new(image);
        self.custom.lock().await.insert(event_id, image.clone());
        image
    }

    /// Drop the decoded custom watermark for an event. Called when the
    /// operator uploads a new image or clears it.
    pub async fn invalidate_custom(&self, event_id: DbId) {
        if self.custom.lock().await.remove(&event_id).is_some() {
            tracing::debug!(event_id, "custom watermark cache invalidated");
        }
    }

    /// Number of cached text overlays.
    pub async fn text_overlay_count(&self) -> usize {
        self.text_overlays.lock().await.len()
    }
}

impl Default for OverlayCache {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
