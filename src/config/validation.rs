use super::models::Config;
use thiserror::Error;

const MAX_BODY_BYTES_LIMIT: u64 = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("nonce_ttl ({nonce_ttl}s) must be at least twice max_clock_skew ({max_clock_skew}s)")]
    NonceTtlTooShort { nonce_ttl: u64, max_clock_skew: u64 },

    #[error("max_body_bytes must be between 1 and {limit}, got {actual}")]
    InvalidBodyLimit { actual: u64, limit: u64 },

    #[error("Invalid remote endpoint '{endpoint}', expected an http:// or https:// URL")]
    InvalidRemoteEndpoint { endpoint: String },

    #[error("ranking.default_limit must not be zero")]
    ZeroRankLimit,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_auth(config)?;
    validate_server(config)?;
    validate_remote(config)?;
    validate_ranking(config)?;
    Ok(())
}

/// A nonce must outlive the window in which its timestamp is still accepted.
/// Timestamps up to `max_clock_skew` in the future are valid, so that window
/// spans twice the skew.
fn validate_auth(config: &Config) -> Result<(), ValidationError> {
    let auth = &config.auth;
    if auth.max_clock_skew.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "auth.max_clock_skew",
        });
    }
    if auth.nonce_ttl.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "auth.nonce_ttl",
        });
    }
    if auth.nonce_ttl.as_secs() < auth.max_clock_skew.as_secs().saturating_mul(2) {
        return Err(ValidationError::NonceTtlTooShort {
            nonce_ttl: auth.nonce_ttl.as_secs(),
            max_clock_skew: auth.max_clock_skew.as_secs(),
        });
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.max_body_bytes.as_u64();
    if actual == 0 || actual > MAX_BODY_BYTES_LIMIT {
        return Err(ValidationError::InvalidBodyLimit {
            actual,
            limit: MAX_BODY_BYTES_LIMIT,
        });
    }
    Ok(())
}

fn validate_remote(config: &Config) -> Result<(), ValidationError> {
    if config.remote.timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "remote.timeout",
        });
    }
    if let Some(endpoint) = &config.remote.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidRemoteEndpoint {
                endpoint: endpoint.clone(),
            });
        }
    }
    Ok(())
}

fn validate_ranking(config: &Config) -> Result<(), ValidationError> {
    if config.ranking.default_limit == 0 {
        return Err(ValidationError::ZeroRankLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::{ByteSize, HumanDuration};

    #[test]
    fn test_defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_nonce_ttl_must_cover_skew() {
        let mut config = Config::default();
        config.auth.max_clock_skew = HumanDuration::from_secs(600);
        config.auth.nonce_ttl = HumanDuration::from_secs(60);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonceTtlTooShort { .. })
        ));
    }

    #[test]
    fn test_nonce_ttl_must_cover_twice_the_skew() {
        let mut config = Config::default();
        config.auth.max_clock_skew = HumanDuration::from_secs(300);
        config.auth.nonce_ttl = HumanDuration::from_secs(300);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonceTtlTooShort {
                nonce_ttl: 300,
                max_clock_skew: 300
            })
        ));

        config.auth.nonce_ttl = HumanDuration::from_secs(599);
        assert!(validate(&config).is_err());

        config.auth.nonce_ttl = HumanDuration::from_secs(600);
        validate(&config).unwrap();
    }

    #[test]
    fn test_zero_skew_rejected() {
        let mut config = Config::default();
        config.auth.max_clock_skew = HumanDuration::from_secs(0);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroDuration { field: "auth.max_clock_skew" })
        ));
    }

    #[test]
    fn test_body_limit_bounds() {
        let mut config = Config::default();
        config.server.max_body_bytes = ByteSize(0);
        assert!(validate(&config).is_err());

        config.server.max_body_bytes = ByteSize(MAX_BODY_BYTES_LIMIT + 1);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_remote_endpoint_scheme() {
        let mut config = Config::default();
        config.remote.endpoint = Some("ftp://ledger".to_string());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidRemoteEndpoint { .. })
        ));

        config.remote.endpoint = Some("http://127.0.0.1:8080".to_string());
        validate(&config).unwrap();
    }
}
