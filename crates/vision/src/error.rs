//! Error type shared by the vision provider clients.

/// Errors from the vision provider layer.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("vision request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("vision API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        message: String,
    },
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
