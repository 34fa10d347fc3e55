//! Configuration management for scorekeeper
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use scorekeeper::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Ledger stored at: {}", config.store.path.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `SCOREKEEPER__<section>__<key>`:
//! - `SCOREKEEPER__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `SCOREKEEPER__AUTH__MAX_CLOCK_SKEW=2m`
//! - `SCOREKEEPER__REMOTE__ENDPOINT=https://ledger.example.com`
//!
//! The shared signing secret is only read from `SCOREKEEPER_SHARED_SECRET`
//! (hex encoded).
//!
//! # Configuration File
//!
//! By default the file is `config/scorekeeper.toml`; `SCOREKEEPER_CONFIG`
//! or `--config` point elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{AuthConfig, Config, RankingConfig, RemoteConfig, ServerConfig, StoreConfig};
pub use sources::{CONFIG_ENV_VAR, SECRET_ENV_VAR};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, the shared secret is not
    /// valid hex, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], with an explicit file overriding `SCOREKEEPER_CONFIG`.
    pub fn load_with(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load a specific file plus environment overrides, without secrets.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[ranking]\ndefault_limit = 3\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.ranking.default_limit, 3);
        assert_eq!(config.auth.max_clock_skew.as_secs(), 300);
    }

    #[test]
    fn test_validation_catches_short_nonce_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[auth]
max_clock_skew = "10m"
nonce_ttl = "1m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::NonceTtlTooShort { .. })
        ));
    }
}
