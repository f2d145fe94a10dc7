//! General application configuration.

use serde::{Deserialize, Serialize};

/// Default registry context (the unnamed one Confluent calls ".").
fn default_context() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Context used when commands don't name one.
    #[serde(default = "default_context")]
    pub default_context: String,

    /// Default output format for commands ("table", "json", or "raw").
    #[serde(default)]
    pub output_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_context: default_context(),
            output_format: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = GeneralConfig::default();
        assert_eq!(config.default_context, ".");
        assert!(config.output_format.is_empty());
    }
}
