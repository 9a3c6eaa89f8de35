//! FinishPix API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! the SSE bridge) so integration tests and the binary entrypoint share
//! one wiring path.

pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod sse;
pub mod state;
