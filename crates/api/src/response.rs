//! Shared response envelope for API handlers.
//!
//! Successful responses wrap their payload as `{ "data": ... }`;
//! [`DataResponse`] gives that shape a type instead of ad-hoc
//! `serde_json::json!` at every call site. Errors use the flat
//! `{ "error", "code" }` body built by
//! [`AppError`](crate::error::AppError).

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: snapshot }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
