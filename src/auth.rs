//! Shared-secret request signing for the remote ledger protocol
//!
//! Every request body is an envelope `{content, timestamp, nonce, auth_token}`.
//! The token is a hex HMAC-SHA256, keyed by the shared secret, over
//! `"{timestamp}/{nonce}/{sha256_hex(content_json)}"`. The server rejects
//! envelopes outside the clock-skew window, nonces it has already seen within
//! the replay window, and tokens that do not verify.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_LENGTH: usize = 40;
pub const MIN_NONCE_LENGTH: usize = 16;
pub const SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request timestamp {timestamp} is outside the allowed window of {max_skew}s")]
    Stale { timestamp: i64, max_skew: u64 },

    #[error("nonce must be at least 16 alphanumeric characters")]
    InvalidNonce,

    #[error("nonce has already been used")]
    ReplayedNonce,

    #[error("auth token does not match")]
    BadToken,

    #[error("invalid shared secret: {0}")]
    InvalidSecret(String),

    #[error("could not serialize request content: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Signed request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest<T> {
    pub content: T,
    pub timestamp: i64,
    pub nonce: String,
    pub auth_token: String,
}

/// Symmetric key shared by client and server. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|err| AuthError::InvalidSecret(err.to_string()))?;
        if bytes.is_empty() {
            return Err(AuthError::InvalidSecret("secret is empty".into()));
        }
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Fresh random secret of [`SECRET_LENGTH`] bytes.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LENGTH];
        rand::thread_rng().fill(bytes.as_mut_slice());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        match HmacSha256::new_from_slice(&self.0) {
            Ok(mac) => mac,
            Err(_) => unreachable!("hmac key length is unrestricted"),
        }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Rebuild every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Hex SHA-256 of the content's canonical JSON, so the digest does not
/// depend on struct field order.
fn content_digest<T: Serialize>(content: &T) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(content)?);
    let json = serde_json::to_vec(&canonical)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

fn signing_payload(timestamp: i64, nonce: &str, digest: &str) -> String {
    format!("{timestamp}/{nonce}/{digest}")
}

pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Sign `content` with the current time and a fresh nonce.
pub fn sign<T: Serialize>(secret: &SharedSecret, content: T) -> Result<SignedRequest<T>> {
    sign_at(secret, content, Utc::now().timestamp(), generate_nonce())
}

pub fn sign_at<T: Serialize>(
    secret: &SharedSecret,
    content: T,
    timestamp: i64,
    nonce: String,
) -> Result<SignedRequest<T>> {
    let digest = content_digest(&content)?;
    let mut mac = secret.mac();
    mac.update(signing_payload(timestamp, &nonce, &digest).as_bytes());
    let auth_token = hex::encode(mac.finalize().into_bytes());
    Ok(SignedRequest {
        content,
        timestamp,
        nonce,
        auth_token,
    })
}

/// Server-side checks for signed envelopes, including the replay cache.
pub struct RequestVerifier {
    secret: SharedSecret,
    max_skew: Duration,
    nonce_ttl: Duration,
    seen: Mutex<HashMap<String, i64>>,
}

impl RequestVerifier {
    pub fn new(secret: SharedSecret, max_skew: Duration, nonce_ttl: Duration) -> Self {
        Self {
            secret,
            max_skew,
            nonce_ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn verify<T: Serialize>(&self, request: &SignedRequest<T>) -> Result<()> {
        self.verify_at(request, Utc::now().timestamp())
    }

    pub fn verify_at<T: Serialize>(&self, request: &SignedRequest<T>, now: i64) -> Result<()> {
        let max_skew = self.max_skew.as_secs();
        let skew = now.abs_diff(request.timestamp);
        if skew > max_skew {
            return Err(AuthError::Stale {
                timestamp: request.timestamp,
                max_skew,
            });
        }

        if request.nonce.len() < MIN_NONCE_LENGTH
            || !request.nonce.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AuthError::InvalidNonce);
        }

        let expected = hex::decode(&request.auth_token).map_err(|_| AuthError::BadToken)?;
        let digest = content_digest(&request.content)?;
        let mut mac = self.secret.mac();
        mac.update(signing_payload(request.timestamp, &request.nonce, &digest).as_bytes());
        mac.verify_slice(&expected).map_err(|_| AuthError::BadToken)?;

        // Only authentic requests are allowed to occupy the replay cache.
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let ttl = i64::try_from(self.nonce_ttl.as_secs()).unwrap_or(i64::MAX);
        seen.retain(|_, first_seen| now.saturating_sub(*first_seen) <= ttl);
        if seen.contains_key(&request.nonce) {
            return Err(AuthError::ReplayedNonce);
        }
        seen.insert(request.nonce.clone(), now);
        debug!(nonces = seen.len(), "Accepted signed request");
        Ok(())
    }
}
