//! Result objects returned by engine operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::{EventId, Person, PersonId, normalize_email};

/// How a caller names a person: by internal id or by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonRef {
    Id(PersonId),
    Email(String),
}

impl PersonRef {
    /// Uuid-shaped input is an id; anything else is treated as an email.
    pub fn parse(identifier: &str) -> Option<Self> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return None;
        }
        match Uuid::parse_str(trimmed) {
            Ok(id) => Some(PersonRef::Id(id)),
            Err(_) => Some(PersonRef::Email(normalize_email(trimmed))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub id: PersonId,
    pub name: String,
    pub email: String,
    pub points: i64,
}

impl From<Person> for PersonEntry {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            name: person.name,
            email: person.email,
            points: person.points,
        }
    }
}

impl From<&Person> for PersonEntry {
    fn from(person: &Person) -> Self {
        person.clone().into()
    }
}

/// An event that was applied or removed, with the people it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    /// Participant states after the operation.
    pub participants: Vec<PersonEntry>,
}

/// One event as seen from an inspected person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: EventId,
    pub name: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    /// Other participants; the inspected person is left out.
    pub with: Vec<PersonEntry>,
}

/// Stored total disagrees with the sum of event deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    pub person: PersonId,
    pub email: String,
    pub stored: i64,
    pub recomputed: i64,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "points for {} do not match their events: stored {}, events sum to {}",
            self.email, self.stored, self.recomputed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonReport {
    pub person: PersonEntry,
    /// Newest first.
    pub events: Vec<EventView>,
    pub warning: Option<ConsistencyWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub position: usize,
    pub id: PersonId,
    pub name: String,
    pub email: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub person: PersonEntry,
    pub stored: i64,
    pub recomputed: i64,
    pub event_count: usize,
    /// `stored == recomputed` at the time of the check.
    pub consistent: bool,
    /// Stored total was overwritten with the recomputed sum.
    pub repaired: bool,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_ref_parse() {
        let id = Uuid::now_v7();
        assert_eq!(PersonRef::parse(&id.to_string()), Some(PersonRef::Id(id)));
        assert_eq!(
            PersonRef::parse(" Bob@Example.com "),
            Some(PersonRef::Email("bob@example.com".to_string()))
        );
        assert_eq!(PersonRef::parse("   "), None);
    }
}
