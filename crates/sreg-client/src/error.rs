//! Registry client error types.

use thiserror::Error;

/// Errors that can occur when talking to a schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Registry API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the registry.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The requested subject, version, or context does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failed to parse a registry response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The registry returned a 429 Too Many Requests response.
    #[error("rate limited — retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },
}

impl RegistryError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Transport failures, 5xx responses, and rate limiting are transient;
    /// 4xx rejections (compatibility violations, malformed schemas, missing
    /// subjects) are terminal.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Parse(_) => false,
        }
    }
}
