//! Request plumbing shared by the cloud and local clients.

use base64::Engine as _;
use serde::de::DeserializeOwned;

use crate::error::VisionError;

/// Encode image bytes for transport inside a JSON body.
pub(crate) fn encode_image(image: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(image)
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`VisionError::Api`] containing the
/// status and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, VisionError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(VisionError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, VisionError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

/// Assert the response has a success status code, discarding the body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<(), VisionError> {
    ensure_success(response).await?;
    Ok(())
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_image_uses_standard_alphabet() {
        // 0xFF 0xEF exercises the `+`/`/` half of the alphabet, which
        // the URL-safe variant would encode differently.
        assert_eq!(encode_image(&[0xFF, 0xEF]), "/+8=");
    }

    #[test]
    fn encode_image_of_empty_input_is_empty() {
        assert_eq!(encode_image(&[]), "");
    }
}
