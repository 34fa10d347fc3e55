//! HTTP client for a remote ledger served by `scorekeeper serve`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::api::models::{
    AdjustmentRequest, ErrorResponse, RegisterPersonRequest, RenamePersonRequest, RenameResponse,
};
use crate::auth::{self, AuthError, SharedSecret};
use crate::engine::{
    BalanceCheck, EngineError, EventSummary, PartialFailure, PersonEntry, PersonReport, RankEntry,
    Result,
};
use crate::ledger::EventId;
use crate::service::LedgerService;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not sign request: {0}")]
    Signing(#[from] AuthError),

    #[error("server responded {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        EngineError::Transport(err.to_string())
    }
}

/// Signs every call with the shared secret and speaks the `/api/*` protocol.
pub struct RemoteClient {
    client: Client,
    endpoint: String,
    secret: SharedSecret,
}

impl RemoteClient {
    pub fn new(endpoint: &str, secret: SharedSecret, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::InvalidEndpoint(endpoint).into());
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scorekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            client,
            endpoint,
            secret,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<C, R>(&self, path: &str, content: C) -> Result<R>
    where
        C: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let envelope = auth::sign(&self.secret, content).map_err(ClientError::from)?;
        let url = format!("{}{}", self.endpoint, path);
        debug!(%url, nonce = %envelope.nonce, "Sending signed request");

        let response = self
            .client
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<R>().await.map_err(ClientError::from)?);
        }

        let text = response.text().await.map_err(ClientError::from)?;
        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => Err(engine_error(status.as_u16(), body)),
            Err(_) => Err(ClientError::Rejected {
                status: status.as_u16(),
                message: text,
            }
            .into()),
        }
    }
}

/// Rebuild the engine error a server reported.
fn engine_error(status: u16, body: ErrorResponse) -> EngineError {
    let inner = body
        .detail
        .as_ref()
        .and_then(|detail| detail.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.message.clone());

    match body.code.as_str() {
        "NOT_FOUND" => EngineError::NotFound(inner),
        "DUPLICATE_IDENTITY" => EngineError::DuplicateIdentity(inner),
        "VALIDATION" => EngineError::Validation(inner),
        "STORAGE" => EngineError::Storage(inner),
        "PARTIAL_APPLICATION" => body
            .detail
            .and_then(|detail| serde_json::from_value::<PartialFailure>(detail).ok())
            .map(|partial| EngineError::PartialApplication(Box::new(partial)))
            .unwrap_or(EngineError::Storage(body.message)),
        "DANGLING_REFERENCE" => {
            let ids = body.detail.as_ref().and_then(|detail| {
                let event = detail.get("event")?.as_str()?.parse().ok()?;
                let person = detail.get("person")?.as_str()?.parse().ok()?;
                Some((event, person))
            });
            match ids {
                Some((event, person)) => EngineError::DanglingReference { event, person },
                None => EngineError::Storage(body.message),
            }
        }
        "INVALID_PAYLOAD" | "PAYLOAD_TOO_LARGE" => EngineError::Validation(body.message),
        _ => ClientError::Rejected {
            status,
            message: body.message,
        }
        .into(),
    }
}

#[async_trait]
impl LedgerService for RemoteClient {
    async fn register_person(&self, name: &str, email: &str) -> Result<PersonEntry> {
        let request = RegisterPersonRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        self.call("/api/people", request).await
    }

    async fn rename_person(&self, email: &str, new_name: &str) -> Result<bool> {
        let request = RenamePersonRequest {
            email: email.to_string(),
            name: new_name.to_string(),
        };
        let response: RenameResponse = self.call("/api/people/rename", request).await?;
        Ok(response.renamed)
    }

    async fn list_people(&self) -> Result<Vec<PersonEntry>> {
        self.call("/api/users", ()).await
    }

    async fn apply_adjustment(
        &self,
        name: &str,
        emails: &[String],
        points: i64,
    ) -> Result<EventSummary> {
        let request = AdjustmentRequest {
            name: name.to_string(),
            people: emails.to_vec(),
            points,
        };
        self.call("/api/adjustments", request).await
    }

    async fn inspect_person(&self, identifier: &str) -> Result<PersonReport> {
        self.call("/api/inspect", identifier).await
    }

    async fn remove_event(&self, id: EventId) -> Result<EventSummary> {
        self.call("/api/events/remove", Some(id.to_string())).await
    }

    async fn remove_most_recent_event(&self) -> Result<EventSummary> {
        self.call("/api/events/remove", None::<String>).await
    }

    async fn rank_top(&self, n: i64) -> Result<Vec<RankEntry>> {
        self.call("/api/rank", n).await
    }

    async fn validate_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        self.call("/api/balance/validate", identifier).await
    }

    async fn recompute_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        self.call("/api/balance/recompute", identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LedgerOperation;
    use serde_json::json;

    fn body(code: &str, detail: Option<serde_json::Value>) -> ErrorResponse {
        ErrorResponse {
            code: code.to_string(),
            message: "server message".to_string(),
            detail,
        }
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let result = RemoteClient::new(
            "ledger.example.com",
            SharedSecret::generate(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(EngineError::Transport(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = RemoteClient::new(
            "http://127.0.0.1:8080/",
            SharedSecret::generate(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_error_bodies_map_back_to_engine_errors() {
        let err = engine_error(404, body("NOT_FOUND", Some(json!("person x"))));
        assert!(matches!(err, EngineError::NotFound(ref inner) if inner == "person x"));

        let err = engine_error(409, body("DUPLICATE_IDENTITY", None));
        assert!(matches!(err, EngineError::DuplicateIdentity(ref inner) if inner == "server message"));

        let err = engine_error(401, body("UNAUTHORIZED", None));
        assert!(matches!(err, EngineError::Transport(_)));
    }

    #[test]
    fn test_partial_failure_detail_is_decoded() {
        let partial = PartialFailure {
            operation: LedgerOperation::Apply,
            event_name: "E".into(),
            points: 1,
            event_id: None,
            event_recorded: false,
            completed: vec!["a@example.com".into()],
            failed: vec![],
            skipped: vec!["c@example.com".into()],
            event_error: None,
        };
        let detail = serde_json::to_value(&partial).unwrap();
        let err = engine_error(409, body("PARTIAL_APPLICATION", Some(detail)));
        assert_eq!(err.partial(), Some(&partial));
    }

    #[test]
    fn test_dangling_reference_detail_is_decoded() {
        let event = uuid::Uuid::now_v7();
        let person = uuid::Uuid::now_v7();
        let detail = json!({ "event": event, "person": person });
        let err = engine_error(500, body("DANGLING_REFERENCE", Some(detail)));
        assert!(matches!(
            err,
            EngineError::DanglingReference { event: e, person: p } if e == event && p == person
        ));
    }
}
