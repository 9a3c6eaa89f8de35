//! In-memory progress tracking and per-stream fan-out.
//!
//! Upload progress is ephemeral: batch sessions and live event counters
//! live in process memory only, are mutated exclusively through
//! [`ProgressTracker`], and reach connected clients through
//! [`ProgressHub`]. A process restart forgets in-flight progress; the
//! photos themselves are already durable in Postgres and object storage.

pub mod hub;
pub mod messages;
pub mod tracker;

pub use hub::{ProgressHub, StreamKey};
pub use messages::{LiveSnapshot, ProgressEvent, RecentPhoto, SessionSnapshot, Snapshot};
pub use tracker::{live_init, session_init, ProgressTracker, RECENT_CAPACITY};
