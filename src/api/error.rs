use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::auth::AuthError;
use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload exceeds the limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error("request rejected: {0}")]
    Unauthorized(#[from] AuthError),
    #[error(transparent)]
    Ledger(#[from] EngineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Ledger(err) => match err {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::DuplicateIdentity(_) => StatusCode::CONFLICT,
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::PartialApplication(_) => StatusCode::CONFLICT,
                EngineError::DanglingReference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::Transport(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Ledger(err) => err.code(),
        }
    }

    /// Structured payload that lets a client rebuild the engine error.
    pub fn detail(&self) -> Option<Value> {
        let ApiError::Ledger(err) = self else {
            return None;
        };
        match err {
            EngineError::NotFound(inner)
            | EngineError::DuplicateIdentity(inner)
            | EngineError::Validation(inner)
            | EngineError::Storage(inner)
            | EngineError::Transport(inner) => Some(Value::String(inner.clone())),
            EngineError::PartialApplication(partial) => serde_json::to_value(partial).ok(),
            EngineError::DanglingReference { event, person } => {
                Some(json!({ "event": event, "person": person }))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LedgerOperation, PartialFailure};

    #[test]
    fn test_engine_errors_map_to_status() {
        let err = ApiError::from(EngineError::NotFound("person x".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.detail(), Some(Value::String("person x".into())));

        let err = ApiError::from(EngineError::DuplicateIdentity("a@example.com".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::from(AuthError::BadToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(err.detail().is_none());
    }

    #[test]
    fn test_partial_application_carries_detail() {
        let partial = PartialFailure {
            operation: LedgerOperation::Reverse,
            event_name: "E".into(),
            points: 2,
            event_id: None,
            event_recorded: true,
            completed: vec![],
            failed: vec![],
            skipped: vec![],
            event_error: Some("io".into()),
        };
        let err = ApiError::from(EngineError::PartialApplication(Box::new(partial.clone())));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let detail = err.detail().unwrap();
        let decoded: PartialFailure = serde_json::from_value(detail).unwrap();
        assert_eq!(decoded, partial);
    }
}
