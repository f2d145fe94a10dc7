//! Shared HTTP response helpers for the REST client.
//!
//! Centralizes status-code checks (404 → NotFound, 429 rate limiting with
//! `Retry-After` parsing, non-success → [`RegistryError::Api`]) so endpoint
//! methods stay focused on request construction and response mapping.

use crate::error::RegistryError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **404 Not Found** → [`RegistryError::NotFound`] carrying the body.
/// - **429 Too Many Requests** → [`RegistryError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`RegistryError::Api`] with status code and
///   response body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, RegistryError> {
    if resp.status() == 404 {
        return Err(RegistryError::NotFound(
            resp.text().await.unwrap_or_default(),
        ));
    }
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(RegistryError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(RegistryError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}
