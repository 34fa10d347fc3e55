use async_trait::async_trait;

use super::error::Result;
use super::models::{Event, EventId, Person, PersonId};

/// Durable storage boundary for people and events.
///
/// Emails passed in are normalized by the implementation. Each call is a
/// single suspension point for the engine; no call spans more than one
/// person's point total.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Exact match on the normalized email. More than one record sharing the
    /// email is reported as [`LedgerError::DuplicateEmail`](super::LedgerError::DuplicateEmail).
    async fn find_person_by_email(&self, email: &str) -> Result<Option<Person>>;

    async fn find_person_by_id(&self, id: PersonId) -> Result<Option<Person>>;

    /// Fails with `EmailTaken` if the normalized email is already registered.
    async fn create_person(&self, name: &str, email: &str) -> Result<Person>;

    /// Persist `name` and `points` of an existing person.
    async fn save_person(&self, person: &Person) -> Result<()>;

    /// Atomic read-modify-write of one person's point total.
    /// Returns `None` if the person does not exist.
    async fn adjust_points(&self, id: PersonId, delta: i64) -> Result<Option<Person>>;

    /// All people in insertion order.
    async fn list_persons(&self) -> Result<Vec<Person>>;

    /// Highest point totals first; ties keep insertion order.
    async fn top_persons_by_points(&self, limit: usize) -> Result<Vec<Person>>;

    async fn create_event(
        &self,
        name: &str,
        points: i64,
        participants: &[PersonId],
    ) -> Result<Event>;

    async fn find_event_by_id(&self, id: EventId) -> Result<Option<Event>>;

    /// Events referencing the person, newest first.
    async fn find_events_by_participant(&self, person: PersonId) -> Result<Vec<Event>>;

    async fn find_most_recent_event(&self) -> Result<Option<Event>>;

    /// Returns `false` if no such event existed.
    async fn delete_event(&self, id: EventId) -> Result<bool>;
}

/// Order people for ranking: points descending, then insertion order.
pub fn rank_persons(mut people: Vec<Person>, limit: usize) -> Vec<Person> {
    people.sort_by(|a, b| b.points.cmp(&a.points).then(a.seq.cmp(&b.seq)));
    people.truncate(limit);
    people
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn person(seq: u64, points: i64) -> Person {
        Person {
            id: Uuid::now_v7(),
            name: format!("p{seq}"),
            email: format!("p{seq}@example.com"),
            points,
            seq,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rank_persons_breaks_ties_by_insertion() {
        let people = vec![person(0, 30), person(1, 10), person(2, 30), person(3, 5)];
        let ranked = rank_persons(people, 3);
        let seqs: Vec<u64> = ranked.iter().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![0, 2, 1]);
    }

    #[test]
    fn test_rank_persons_zero_limit() {
        let people = vec![person(0, 1)];
        assert!(rank_persons(people, 0).is_empty());
    }
}
