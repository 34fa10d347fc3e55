use crate::auth::SharedSecret;
use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// Local fjall keyspace
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

/// HTTP server for remote mode
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize(64 * 1024)
}

/// Signed-request checks shared by server and client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_max_clock_skew")]
    pub max_clock_skew: HumanDuration,
    /// How long a seen nonce is remembered; must be at least twice `max_clock_skew`.
    #[serde(default = "default_nonce_ttl")]
    pub nonce_ttl: HumanDuration,
    /// Loaded from `SCOREKEEPER_SHARED_SECRET`, never from the config file
    #[serde(skip)]
    pub shared_secret: Option<SharedSecret>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_clock_skew: default_max_clock_skew(),
            nonce_ttl: default_nonce_ttl(),
            shared_secret: None,
        }
    }
}

fn default_max_clock_skew() -> HumanDuration {
    HumanDuration::from_secs(5 * 60)
}

fn default_nonce_ttl() -> HumanDuration {
    HumanDuration::from_secs(10 * 60)
}

/// Client side of remote mode
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_remote_timeout")]
    pub timeout: HumanDuration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_remote_timeout(),
        }
    }
}

fn default_remote_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Used by `scorekeeper rank` when no count is given
    #[serde(default = "default_rank_limit")]
    pub default_limit: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_rank_limit(),
        }
    }
}

fn default_rank_limit() -> i64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.max_body_bytes.as_u64(), 64 * 1024);
        assert_eq!(config.auth.max_clock_skew.as_secs(), 300);
        assert_eq!(config.auth.nonce_ttl.as_secs(), 600);
        assert!(config.auth.shared_secret.is_none());
        assert_eq!(config.ranking.default_limit, 10);
        assert_eq!(config.store.path, PathBuf::from("data/ledger"));
    }
}
