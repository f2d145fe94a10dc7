//! Migration engine tuning knobs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of subject chains applied concurrently.
const fn default_concurrency() -> usize {
    4
}

/// Default retry attempts for transient registry failures.
const fn default_retry_attempts() -> u32 {
    3
}

/// Default initial backoff delay in milliseconds.
const fn default_retry_base_delay_ms() -> u64 {
    200
}

/// Default backoff cap in milliseconds.
const fn default_retry_max_delay_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationConfig {
    /// Upper bound on concurrently running subject chains.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retry attempts (including the first) for transient failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Initial backoff delay before the first retry, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Backoff delay cap, in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl MigrationConfig {
    /// Reject knob values the engine cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero concurrency bound,
    /// zero retry attempts, or a base delay above the delay cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "migration.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "migration.retry_attempts".to_string(),
                reason: "must be at least 1 (the initial attempt counts)".to_string(),
            });
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "migration.retry_base_delay_ms".to_string(),
                reason: format!(
                    "exceeds retry_max_delay_ms ({} > {})",
                    self.retry_base_delay_ms, self.retry_max_delay_ms
                ),
            });
        }
        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = MigrationConfig::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 200);
        assert_eq!(config.retry_max_delay_ms, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = MigrationConfig {
            concurrency: 0,
            ..MigrationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { field, .. } if field == "migration.concurrency")
        );
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let config = MigrationConfig {
            retry_base_delay_ms: 10_000,
            retry_max_delay_ms: 500,
            ..MigrationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
