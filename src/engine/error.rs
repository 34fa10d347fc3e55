use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{EventId, LedgerError, PersonId};

/// Which multi-step ledger procedure a partial failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOperation {
    Apply,
    Reverse,
}

impl fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerOperation::Apply => f.write_str("apply"),
            LedgerOperation::Reverse => f.write_str("reverse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFailure {
    /// Email when the participant was named by email, otherwise the person id.
    pub participant: String,
    pub reason: String,
}

/// Exact account of a multi-step operation that stopped partway.
///
/// `completed` participants had their totals mutated and persisted, `failed`
/// ones did not, and `skipped` ones were never attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailure {
    pub operation: LedgerOperation,
    pub event_name: String,
    pub points: i64,
    pub event_id: Option<EventId>,
    /// Whether the event record exists after the operation.
    pub event_recorded: bool,
    pub completed: Vec<String>,
    pub failed: Vec<ParticipantFailure>,
    pub skipped: Vec<String>,
    /// Failure writing or deleting the event record itself.
    pub event_error: Option<String>,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of \"{}\" stopped partway: {} completed, {} failed, {} skipped",
            self.operation,
            self.event_name,
            self.completed.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        if let Some(err) = &self.event_error {
            write!(f, "; event record: {err}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0} matches more than one person record; this must be fixed manually in the store")]
    DuplicateIdentity(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    PartialApplication(Box<PartialFailure>),

    #[error("event {event} references missing person {person}")]
    DanglingReference { event: EventId, person: PersonId },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("remote ledger unreachable: {0}")]
    Transport(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::DuplicateIdentity(_) => "DUPLICATE_IDENTITY",
            EngineError::Validation(_) => "VALIDATION",
            EngineError::PartialApplication(_) => "PARTIAL_APPLICATION",
            EngineError::DanglingReference { .. } => "DANGLING_REFERENCE",
            EngineError::Storage(_) => "STORAGE",
            EngineError::Transport(_) => "TRANSPORT",
        }
    }

    pub fn partial(&self) -> Option<&PartialFailure> {
        match self {
            EngineError::PartialApplication(partial) => Some(partial.as_ref()),
            _ => None,
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EmailTaken(email) => EngineError::DuplicateIdentity(email),
            LedgerError::DuplicateEmail { email, .. } => EngineError::DuplicateIdentity(email),
            LedgerError::PersonNotFound(id) => EngineError::NotFound(format!("person {id}")),
            LedgerError::PointsOverflow(id) => {
                EngineError::Validation(format!("point total for person {id} would overflow"))
            }
            LedgerError::InvalidEvent(reason) => EngineError::Validation(reason),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
