//! # sreg-config
//!
//! Layered configuration loading for sreg using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SREG_*` prefix, `__` as separator)
//! 2. Project-level `.sreg/config.toml`
//! 3. User-level `~/.config/sreg/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SREG_SOURCE__URL` -> `source.url`,
//! `SREG_MIGRATION__CONCURRENCY` -> `migration.concurrency`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use sreg_config::SregConfig;
//!
//! // Load from all sources (dotenvy + TOML + env):
//! let config = SregConfig::load_with_dotenv().expect("config");
//!
//! // Or without dotenvy (env vars must already be set):
//! let config = SregConfig::load().expect("config");
//!
//! if config.source.is_configured() {
//!     println!("Source registry: {}", config.source.url);
//! }
//! ```

mod error;
mod general;
mod migration;
mod registry;

pub use error::ConfigError;
pub use general::GeneralConfig;
pub use migration::MigrationConfig;
pub use registry::RegistryConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SregConfig {
    #[serde(default)]
    pub source: RegistryConfig,
    #[serde(default)]
    pub destination: RegistryConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl SregConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables (`SREG_*` prefix)
    /// 2. `.sreg/config.toml` (project-local)
    /// 3. `~/.config/sreg/config.toml` (user-global)
    /// 4. Default values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if any layer fails to parse or the
    /// merged result doesn't extract, and [`ConfigError::InvalidValue`] for
    /// tuning knobs the engine cannot honor.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract().map_err(ConfigError::from)?;
        config.migration.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Calls `dotenvy` to load the `.env` file from the workspace root before
    /// building the figment. This is the typical entry point for the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".sreg/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment = figment.merge(Env::prefixed("SREG_").split("__"));

        figment
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sreg").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir looking
    /// for a `.env` file. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // Walk up at most 3 levels (crate -> crates/ -> workspace root)
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        // Fallback: try current directory
        let _ = dotenvy::dotenv();
    }

    /// Require the source endpoint to be configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when `source.url` is empty.
    pub fn require_source(&self) -> Result<&RegistryConfig, ConfigError> {
        if self.source.is_configured() {
            Ok(&self.source)
        } else {
            Err(ConfigError::NotConfigured {
                section: "source".to_string(),
            })
        }
    }

    /// Require the destination endpoint to be configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when `destination.url` is empty.
    pub fn require_destination(&self) -> Result<&RegistryConfig, ConfigError> {
        if self.destination.is_configured() {
            Ok(&self.destination)
        } else {
            Err(ConfigError::NotConfigured {
                section: "destination".to_string(),
            })
        }
    }
}
