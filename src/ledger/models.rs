//! Records persisted by the ledger store.
//!
//! A [`Person`] carries a running point total; an [`Event`] records a point
//! delta applied identically to every listed participant. Persons never hold
//! back-pointers to events: participation is answered by querying events that
//! reference a person id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PersonId = Uuid;
pub type EventId = Uuid;

/// Normalize an email into its stored form (trimmed, lowercase).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A tracked participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Business key, always stored normalized.
    pub email: String,
    #[serde(default)]
    pub points: i64,
    /// Insertion order; breaks ranking ties.
    pub seq: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A point adjustment applied to a group of participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub points: i64,
    /// Participant ids in the order they were supplied.
    pub people: Vec<PersonId>,
    pub seq: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn involves(&self, person: &PersonId) -> bool {
        self.people.contains(person)
    }
}
