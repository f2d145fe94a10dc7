//! Registry endpoint configuration.

use serde::{Deserialize, Serialize};

/// Default HTTP request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    30
}

/// One registry endpoint: where it is and how to talk to it.
///
/// Used twice in [`crate::SregConfig`], as `source` and `destination`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Base URL (e.g., `http://localhost:8081`).
    #[serde(default)]
    pub url: String,

    /// Basic-auth username; empty means unauthenticated.
    #[serde(default)]
    pub username: String,

    /// Basic-auth password.
    #[serde(default)]
    pub password: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RegistryConfig {
    /// Check if the endpoint has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// Check if basic-auth credentials are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}
