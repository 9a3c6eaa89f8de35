//! Debounced trigger for provider-side face clustering.
//!
//! Every processed photo asks for a clustering run; actually running one
//! per photo would hammer the provider. Instead each request resets a
//! per-event quiet timer, and only the last request in a burst survives
//! to dispatch the job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use finishpix_core::types::DbId;
use finishpix_vision::ClusterRunner;

/// Reset-on-call debounce around a [`ClusterRunner`].
pub struct ClusterScheduler {
    quiet_period: Duration,
    runner: Arc<dyn ClusterRunner>,
    /// Latest generation per event. A sleeper fires only if it still
    /// holds the newest generation when it wakes.
    generations: Arc<Mutex<HashMap<DbId, u64>>>,
}

impl ClusterScheduler {
    pub fn new(quiet_period: Duration, runner: Arc<dyn ClusterRunner>) -> Self {
        Self {
            quiet_period,
            runner,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Request a clustering run for `event_id` once things go quiet.
    ///
    /// Each call supersedes any pending one for the same event: the run
    /// fires `quiet_period` after the most recent call. A dispatch
    /// failure is logged, not retried; the next processed photo
    /// schedules again anyway.
    pub async fn schedule(&self, event_id: DbId) {
        let generation = {
            let mut generations = self.generations.lock().await;
            let counter = generations.entry(event_id).or_insert(0);
            *counter += 1;
            *counter
        };

        let quiet_period = self.quiet_period;
        let generations = self.generations.clone();
        let runner = self.runner.clone();

        tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            {
                let mut generations = generations.lock().await;
                match generations.get(&event_id) {
                    // Still the newest request: claim it.
                    Some(&current) if current == generation => {
                        generations.remove(&event_id);
                    }
                    // Superseded by a later call.
                    _ => return,
                }
            }

            tracing::debug!(event_id, "quiet period elapsed, triggering face clustering");
            if let Err(error) = runner.trigger_clustering(event_id).await {
                tracing::warn!(event_id, error = %error, "face clustering trigger failed");
            }
        });
    }

    /// Number of events with a pending (not yet fired) run.
    pub async fn pending(&self) -> usize {
        self.generations.lock().await.len()
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
