use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{LedgerError, Result};
use super::models::{Event, EventId, Person, PersonId, normalize_email};
use super::partitions::{
    decode_email_key, decode_id, decode_participation_key, encode_email_key, encode_email_prefix,
    encode_event_key, encode_meta_key, encode_participation_key, encode_participation_prefix,
    encode_person_key, encode_timeline_key,
};
use super::traits::{LedgerStore, rank_persons};

const META_NEXT_SEQ: &str = "next_seq";

/// Fjall-backed persistent storage for people and events
///
/// Writes go through a process-wide write lock so that the sequence counter and
/// per-person read-modify-write cycles are never interleaved. An event and its
/// index entries are committed in a single batch.
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    people: PartitionHandle,
    emails: PartitionHandle,
    events: PartitionHandle,
    timeline: PartitionHandle,
    participation: PartitionHandle,
    metadata: PartitionHandle,
    seq_counter: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let people = keyspace.open_partition("people", PartitionCreateOptions::default())?;
        let emails = keyspace.open_partition("emails", PartitionCreateOptions::default())?;
        let events = keyspace.open_partition("events", PartitionCreateOptions::default())?;
        let timeline = keyspace.open_partition("timeline", PartitionCreateOptions::default())?;
        let participation =
            keyspace.open_partition("participation", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        let next_seq = match metadata.get(encode_meta_key(META_NEXT_SEQ))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    LedgerError::InvalidKey(format!("{META_NEXT_SEQ} {:?}", bytes.as_ref()))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };

        info!(next_seq, "Fjall store opened successfully");
        Ok(Self {
            keyspace,
            people,
            emails,
            events,
            timeline,
            participation,
            metadata,
            seq_counter: Arc::new(AtomicU64::new(next_seq)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut person_count = 0;
        let mut event_count = 0;

        for item in self.people.iter() {
            item?;
            person_count += 1;
        }

        for item in self.events.iter() {
            item?;
            event_count += 1;
        }

        Ok(StoreStats {
            person_count,
            event_count,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn next_seq(&self) -> u64 {
        self.seq_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn get_person(&self, id: &PersonId) -> Result<Option<Person>> {
        match self.people.get(encode_person_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        match self.events.get(encode_event_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn person_ids_for_email(&self, email: &str) -> Result<Vec<PersonId>> {
        let mut ids = Vec::new();
        for item in self.emails.prefix(encode_email_prefix(email)) {
            let (key, _) = item?;
            if let Some(id) = decode_email_key(&key, email) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Person>> {
        let email = normalize_email(email);
        let ids = self.person_ids_for_email(&email)?;
        match ids.as_slice() {
            [] => Ok(None),
            [id] => {
                let person = self.get_person(id)?;
                if person.is_none() {
                    warn!(%email, person_id = %id, "Email index points at a missing person");
                }
                Ok(person)
            }
            _ => Err(LedgerError::DuplicateEmail {
                email,
                count: ids.len(),
            }),
        }
    }

    fn insert_person(&self, name: &str, email: &str) -> Result<Person> {
        let email = normalize_email(email);
        let _guard = self.lock()?;

        if !self.person_ids_for_email(&email)?.is_empty() {
            return Err(LedgerError::EmailTaken(email));
        }

        let seq = self.next_seq();
        let person = Person {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email,
            points: 0,
            seq,
            created_at: Utc::now(),
        };

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.people,
            encode_person_key(&person.id),
            serde_json::to_vec(&person)?,
        );
        batch.insert(&self.emails, encode_email_key(&person.email, &person.id), b"");
        batch.insert(
            &self.metadata,
            encode_meta_key(META_NEXT_SEQ),
            (seq + 1).to_be_bytes(),
        );
        batch.commit()?;

        debug!(person_id = %person.id, email = %person.email, "Created person");
        Ok(person)
    }

    fn update_person(&self, person: &Person) -> Result<()> {
        let _guard = self.lock()?;
        let mut stored = self
            .get_person(&person.id)?
            .ok_or(LedgerError::PersonNotFound(person.id))?;
        stored.name = person.name.clone();
        stored.points = person.points;
        self.people
            .insert(encode_person_key(&stored.id), serde_json::to_vec(&stored)?)?;
        debug!(person_id = %stored.id, points = stored.points, "Saved person");
        Ok(())
    }

    fn add_points(&self, id: &PersonId, delta: i64) -> Result<Option<Person>> {
        let _guard = self.lock()?;
        let Some(mut person) = self.get_person(id)? else {
            return Ok(None);
        };
        person.points = person
            .points
            .checked_add(delta)
            .ok_or(LedgerError::PointsOverflow(person.id))?;
        self.people
            .insert(encode_person_key(id), serde_json::to_vec(&person)?)?;
        debug!(person_id = %id, delta, points = person.points, "Adjusted points");
        Ok(Some(person))
    }

    fn all_persons(&self) -> Result<Vec<Person>> {
        let mut people = Vec::new();
        for item in self.people.iter() {
            let (_, value) = item?;
            people.push(serde_json::from_slice::<Person>(&value)?);
        }
        people.sort_by_key(|p| p.seq);
        Ok(people)
    }

    fn insert_event(&self, name: &str, points: i64, participants: &[PersonId]) -> Result<Event> {
        if participants.is_empty() {
            return Err(LedgerError::InvalidEvent(
                "an event needs at least one participant".to_string(),
            ));
        }

        let _guard = self.lock()?;
        let seq = self.next_seq();
        let event = Event {
            id: Uuid::now_v7(),
            name: name.to_string(),
            points,
            people: participants.to_vec(),
            seq,
            created_at: Utc::now(),
        };
        let event_id = event.id.to_string();

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.events,
            encode_event_key(&event.id),
            serde_json::to_vec(&event)?,
        );
        batch.insert(&self.timeline, encode_timeline_key(seq), event_id.as_bytes());
        for person in &event.people {
            batch.insert(
                &self.participation,
                encode_participation_key(person, seq),
                event_id.as_bytes(),
            );
        }
        batch.insert(
            &self.metadata,
            encode_meta_key(META_NEXT_SEQ),
            (seq + 1).to_be_bytes(),
        );
        batch.commit()?;

        debug!(event_id = %event.id, participants = event.people.len(), "Created event");
        Ok(event)
    }

    fn events_for(&self, person: &PersonId) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for item in self.participation.prefix(encode_participation_prefix(person)).rev() {
            let (key, value) = item?;
            let invalid = || LedgerError::InvalidKey(String::from_utf8_lossy(&key).into());
            match decode_participation_key(&key) {
                Some((owner, _)) if owner == *person => {}
                _ => return Err(invalid()),
            }
            let id = decode_id(&value).ok_or_else(invalid)?;
            match self.get_event(&id)? {
                Some(event) => events.push(event),
                None => warn!(event_id = %id, person_id = %person, "Stale participation entry"),
            }
        }
        Ok(events)
    }

    fn latest_event(&self) -> Result<Option<Event>> {
        for item in self.timeline.iter().rev() {
            let (key, value) = item?;
            let id = decode_id(&value)
                .ok_or_else(|| LedgerError::InvalidKey(format!("timeline {:?}", key.as_ref())))?;
            if let Some(event) = self.get_event(&id)? {
                return Ok(Some(event));
            }
            warn!(event_id = %id, "Stale timeline entry");
        }
        Ok(None)
    }

    fn remove_event(&self, id: &EventId) -> Result<bool> {
        let _guard = self.lock()?;
        let Some(event) = self.get_event(id)? else {
            return Ok(false);
        };

        let mut batch = self.keyspace.batch();
        batch.remove(&self.events, encode_event_key(id));
        batch.remove(&self.timeline, encode_timeline_key(event.seq));
        for person in &event.people {
            batch.remove(
                &self.participation,
                encode_participation_key(person, event.seq),
            );
        }
        batch.commit()?;

        debug!(event_id = %id, "Deleted event");
        Ok(true)
    }
}

#[async_trait]
impl LedgerStore for FjallStore {
    async fn find_person_by_email(&self, email: &str) -> Result<Option<Person>> {
        self.find_by_email(email)
    }

    async fn find_person_by_id(&self, id: PersonId) -> Result<Option<Person>> {
        self.get_person(&id)
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
        self.get_event(&id)
    }

    async fn find_events_by_participant(&self, person: PersonId) -> Result<Vec<Event>> {
        self.events_for(&person)
    }

    async fn find_most_recent_event(&self) -> Result<Option<Event>> {
        self.latest_event()
    }

    async fn delete_event(&self, id: EventId) -> Result<bool> {
        self.remove_event(&id)
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub person_count: usize,
    pub event_count: usize,
}
