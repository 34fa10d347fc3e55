use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::error::{LedgerError, Result};
use super::models::{Event, EventId, Person, PersonId, normalize_email};
use super::traits::{LedgerStore, rank_persons};

/// In-memory ledger store for tests, demos, and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    people: BTreeMap<PersonId, Person>,
    events: BTreeMap<EventId, Event>,
    next_seq: u64,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn with_email(&self, email: &str) -> Vec<&Person> {
        self.people.values().filter(|p| p.email == email).collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a person record outside of normal ledger operations.
    ///
    /// Events referencing the person are left untouched, which is exactly the
    /// out-of-band damage the engine has to report on.
    pub fn purge_person(&self, id: PersonId) -> Result<Option<Person>> {
        Ok(self.write()?.people.remove(&id))
    }

    /// Insert a person record verbatim, bypassing the email uniqueness check.
    pub fn insert_raw_person(&self, person: Person) -> Result<()> {
        self.write()?.people.insert(person.id, person);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.inner.read().map_err(|_| LedgerError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.inner.write().map_err(|_| LedgerError::Poisoned)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Person>> {
        let email = normalize_email(email);
        let state = self.read()?;
        let matches = state.with_email(&email);
        match matches.as_slice() {
            [] => Ok(None),
            [person] => Ok(Some((*person).clone())),
            _ => Err(LedgerError::DuplicateEmail {
                email,
                count: matches.len(),
            }),
        }
    }

    fn insert_person(&self, name: &str, email: &str) -> Result<Person> {
        let email = normalize_email(email);
        let mut state = self.write()?;
        if !state.with_email(&email).is_empty() {
            return Err(LedgerError::EmailTaken(email));
        }
        let person = Person {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email,
            points: 0,
            seq: state.next_seq(),
            created_at: Utc::now(),
        };
        state.people.insert(person.id, person.clone());
        Ok(person)
    }

    fn update_person(&self, person: &Person) -> Result<()> {
        let mut state = self.write()?;
        let stored = state
            .people
            .get_mut(&person.id)
            .ok_or(LedgerError::PersonNotFound(person.id))?;
        stored.name = person.name.clone();
        stored.points = person.points;
        Ok(())
    }

    fn add_points(&self, id: &PersonId, delta: i64) -> Result<Option<Person>> {
        let mut state = self.write()?;
        let Some(person) = state.people.get_mut(id) else {
            return Ok(None);
        };
        person.points = person
            .points
            .checked_add(delta)
            .ok_or(LedgerError::PointsOverflow(person.id))?;
        Ok(Some(person.clone()))
    }

    fn all_persons(&self) -> Result<Vec<Person>> {
        let mut people: Vec<Person> = self.read()?.people.values().cloned().collect();
        people.sort_by_key(|p| p.seq);
        Ok(people)
    }

    fn insert_event(&self, name: &str, points: i64, participants: &[PersonId]) -> Result<Event> {
        if participants.is_empty() {
            return Err(LedgerError::InvalidEvent(
                "an event needs at least one participant".to_string(),
            ));
        }
        let mut state = self.write()?;
        let event = Event {
            id: Uuid::now_v7(),
            name: name.to_string(),
            points,
            people: participants.to_vec(),
            seq: state.next_seq(),
            created_at: Utc::now(),
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    fn events_for(&self, person: &PersonId) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .read()?
            .events
            .values()
            .filter(|e| e.involves(person))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(events)
    }

    fn latest_event(&self) -> Result<Option<Event>> {
        Ok(self.read()?.events.values().max_by_key(|e| e.seq).cloned())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_person_by_email(&self, email: &str) -> Result<Option<Person>> {
        self.find_by_email(email)
    }

    async fn find_person_by_id(&self, id: PersonId) -> Result<Option<Person>> {
        Ok(self.read()?.people.get(&id).cloned())
    }

    async fn create_person(&self, name: &str, email: &str) -> Result<Person> {
        self.insert_person(name, email)
    }

    async fn save_person(&self, person: &Person) -> Result<()> {
        self.update_person(person)
    }

    async fn adjust_points(&self, id: PersonId, delta: i64) -> Result<Option<Person>> {
        self.add_points(&id, delta)
    }

    async fn list_persons(&self) -> Result<Vec<Person>> {
        self.all_persons()
    }

    async fn top_persons_by_points(&self, limit: usize) -> Result<Vec<Person>> {
        Ok(rank_persons(self.all_persons()?, limit))
    }

    async fn create_event(
        &self,
        name: &str,
        points: i64,
        participants: &[PersonId],
    ) -> Result<Event> {
        self.insert_event(name, points, participants)
    }

    async fn find_event_by_id(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.read()?.events.get(&id).cloned())
    }

    async fn find_events_by_participant(&self, person: PersonId) -> Result<Vec<Event>> {
        self.events_for(&person)
    }

    async fn find_most_recent_event(&self) -> Result<Option<Event>> {
        self.latest_event()
    }

    async fn delete_event(&self, id: EventId) -> Result<bool> {
        Ok(self.write()?.events.remove(&id).is_some())
    }
}
