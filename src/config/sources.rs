use super::models::Config;
use crate::auth::SharedSecret;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

pub const CONFIG_ENV_VAR: &str = "SCOREKEEPER_CONFIG";
pub const SECRET_ENV_VAR: &str = "SCOREKEEPER_SHARED_SECRET";
const DEFAULT_CONFIG_PATH: &str = "config/scorekeeper.toml";
const ENV_PREFIX: &str = "SCOREKEEPER";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
///
/// An explicit `path` wins over `SCOREKEEPER_CONFIG`.
pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = path.unwrap_or_else(|| {
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    });

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config)?;
    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(encoded) = env::var(SECRET_ENV_VAR) {
        let secret = SharedSecret::from_hex(&encoded)
            .map_err(|err| ConfigError::Message(format!("{SECRET_ENV_VAR}: {err}")))?;
        config.auth.shared_secret = Some(secret);
    }
    Ok(())
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // SCOREKEEPER__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(config.remote.endpoint.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[store]
path = "/var/lib/scorekeeper"

[server]
bind_addr = "127.0.0.1:9000"
max_body_bytes = "1MB"

[auth]
max_clock_skew = "2m"
nonce_ttl = 300

[remote]
endpoint = "https://ledger.example.com"
timeout = "30s"

[ranking]
default_limit = 25
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/scorekeeper"));
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.max_body_bytes.as_u64(), 1024 * 1024);
        assert_eq!(config.auth.max_clock_skew.as_secs(), 120);
        assert_eq!(config.auth.nonce_ttl.as_secs(), 300);
        assert_eq!(
            config.remote.endpoint.as_deref(),
            Some("https://ledger.example.com")
        );
        assert_eq!(config.remote.timeout.as_secs(), 30);
        assert_eq!(config.ranking.default_limit, 25);
    }

    #[test]
    fn test_malformed_duration_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[auth]\nmax_clock_skew = \"soon\"\n").unwrap();

        assert!(load_from_sources(config_path).is_err());
    }
}
