use thiserror::Error;

use super::models::PersonId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Email {email} matches {count} person records")]
    DuplicateEmail { email: String, count: usize },

    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    #[error("Point total overflow for person {0}")]
    PointsOverflow(PersonId),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
