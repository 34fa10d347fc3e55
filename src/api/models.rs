//! Wire types for the remote ledger API.
//!
//! Every `POST /api/*` body is a [`SignedRequest`](crate::auth::SignedRequest)
//! wrapping one of the request contents below (or a bare string, integer, or
//! `null` where noted in the router). Successful responses are the engine's
//! report types serialized as JSON; failures are an [`ErrorResponse`].
//!
//! ```json
//! {
//!   "content": { "name": "game night", "people": ["a@example.com"], "points": 3 },
//!   "timestamp": 1792422245,
//!   "nonce": "Zt3q9Wm0cQ1fXb7LrV2yNs8kPj4HdA6eTg5uKoEi",
//!   "auth_token": "5b0f...e1"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPersonRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePersonRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub name: String,
    /// Participant emails, applied in this order.
    pub people: Vec<String>,
    pub points: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameResponse {
    pub renamed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
