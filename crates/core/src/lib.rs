//! Pure domain logic for the FinishPix processing backend.
//!
//! No I/O, no async, no database: everything in this crate is a function of
//! its inputs so it can be unit-tested exhaustively. The pipeline, API, and
//! persistence crates build on top of these primitives.

pub mod bibs;
pub mod credits;
pub mod error;
pub mod retouch;
pub mod sharpness;
pub mod types;
pub mod upload;
pub mod watermark;

pub use error::CoreError;
pub use types::{DbId, Timestamp};
