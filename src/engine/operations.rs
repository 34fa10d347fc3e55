use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use super::error::{EngineError, LedgerOperation, ParticipantFailure, PartialFailure, Result};
use super::reports::{
    BalanceCheck, ConsistencyWarning, EventSummary, EventView, PersonEntry, PersonRef,
    PersonReport, RankEntry,
};
use crate::ledger::{Event, EventId, LedgerError, LedgerStore, Person, PersonId, normalize_email};
use crate::observability::Metrics;

/// Invariant-preserving operations over a [`LedgerStore`].
///
/// Every multi-step operation touches participants strictly one after
/// another, so a failure leaves a deterministic prefix of completed work that
/// is reported back as [`EngineError::PartialApplication`].
pub struct LedgerEngine<S> {
    store: Arc<S>,
    metrics: Arc<Metrics>,
}

impl<S> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_metrics(store, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(store: Arc<S>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Enroll a new person. The email must not already be registered.
    pub async fn register_person(&self, name: &str, email: &str) -> Result<Person> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() {
            return Err(EngineError::Validation("name must not be empty".into()));
        }
        if email.is_empty() {
            return Err(EngineError::Validation("email must not be empty".into()));
        }

        let person = self.store.create_person(name, &email).await?;
        info!(person_id = %person.id, email = %person.email, "Registered person");
        Ok(person)
    }

    /// Returns `Ok(false)` when the email matches zero or several records.
    pub async fn rename_person(&self, email: &str, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(EngineError::Validation("name must not be empty".into()));
        }

        let mut person = match self.store.find_person_by_email(email).await {
            Ok(Some(person)) => person,
            Ok(None) => return Ok(false),
            Err(LedgerError::DuplicateEmail { email, count }) => {
                warn!(%email, count, "Refusing to rename an ambiguous email");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        person.name = new_name.to_string();
        self.store.save_person(&person).await?;
        info!(person_id = %person.id, name = %person.name, "Renamed person");
        Ok(true)
    }

    /// Directory of everyone enrolled, in enrollment order.
    pub async fn list_people(&self) -> Result<Vec<PersonEntry>> {
        let people = self.store.list_persons().await?;
        Ok(people.into_iter().map(PersonEntry::from).collect())
    }

    /// Add `points` to every listed person and record the event.
    ///
    /// Participants are resolved and credited one at a time in the given
    /// order. If a lookup or write fails after at least one person was
    /// credited, those credits stay in place and the error lists exactly who
    /// was and was not processed.
    pub async fn apply_adjustment(
        &self,
        name: &str,
        emails: &[String],
        points: i64,
    ) -> Result<EventSummary> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("event name must not be empty".into()));
        }
        let emails = normalize_participants(emails)?;

        let mut credited: Vec<Person> = Vec::with_capacity(emails.len());
        for (index, email) in emails.iter().enumerate() {
            let failure = match self.store.find_person_by_email(email).await {
                Ok(Some(person)) => match self.store.adjust_points(person.id, points).await {
                    Ok(Some(updated)) => {
                        credited.push(updated);
                        continue;
                    }
                    Ok(None) => EngineError::NotFound(format!("person {email}")),
                    Err(err) => err.into(),
                },
                Ok(None) => EngineError::NotFound(format!("email \"{email}\" is not registered")),
                Err(err) => err.into(),
            };

            if credited.is_empty() {
                return Err(failure);
            }

            let partial = PartialFailure {
                operation: LedgerOperation::Apply,
                event_name: name.to_string(),
                points,
                event_id: None,
                event_recorded: false,
                completed: credited.iter().map(|p| p.email.clone()).collect(),
                failed: vec![ParticipantFailure {
                    participant: email.clone(),
                    reason: failure.to_string(),
                }],
                skipped: emails[index + 1..].to_vec(),
                event_error: None,
            };
            return Err(self.partial(partial));
        }

        let ids: Vec<PersonId> = credited.iter().map(|p| p.id).collect();
        let event = match self.store.create_event(name, points, &ids).await {
            Ok(event) => event,
            Err(err) => {
                let partial = PartialFailure {
                    operation: LedgerOperation::Apply,
                    event_name: name.to_string(),
                    points,
                    event_id: None,
                    event_recorded: false,
                    completed: credited.iter().map(|p| p.email.clone()).collect(),
                    failed: Vec::new(),
                    skipped: Vec::new(),
                    event_error: Some(err.to_string()),
                };
                return Err(self.partial(partial));
            }
        };

        self.metrics.event_applied();
        info!(
            event_id = %event.id,
            name = %event.name,
            points,
            participants = ids.len(),
            "Applied adjustment"
        );
        Ok(summarize(&event, credited))
    }

    /// Full history of one person, newest first, with a balance check.
    ///
    /// `identifier` is either an email or a person id. A stored total that
    /// disagrees with the events is logged and attached as a warning; the
    /// report is still returned.
    pub async fn inspect_person(&self, identifier: &str) -> Result<PersonReport> {
        let person = self.resolve(identifier).await?;
        let events = self.store.find_events_by_participant(person.id).await?;
        let roster = self.resolve_participants(&person, &events).await?;

        let mut views = Vec::with_capacity(events.len());
        let mut recomputed: i64 = 0;
        for event in &events {
            let with = event
                .people
                .iter()
                .filter(|id| **id != person.id)
                .filter_map(|id| roster.get(id))
                .map(PersonEntry::from)
                .collect();
            views.push(EventView {
                id: event.id,
                name: event.name.clone(),
                points: event.points,
                created_at: event.created_at,
                with,
            });
            recomputed = recomputed.saturating_add(event.points);
        }

        let warning = if recomputed != person.points {
            warn!(
                email = %person.email,
                stored = person.points,
                recomputed,
                "Stored points do not match event history"
            );
            self.metrics.consistency_warning();
            Some(ConsistencyWarning {
                person: person.id,
                email: person.email.clone(),
                stored: person.points,
                recomputed,
            })
        } else {
            None
        };

        Ok(PersonReport {
            person: person.into(),
            events: views,
            warning,
        })
    }

    pub async fn remove_event(&self, id: EventId) -> Result<EventSummary> {
        let event = self
            .store
            .find_event_by_id(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {id}")))?;
        self.reverse(event).await
    }

    pub async fn remove_most_recent_event(&self) -> Result<EventSummary> {
        let event = self
            .store
            .find_most_recent_event()
            .await?
            .ok_or_else(|| EngineError::NotFound("no events have been recorded".into()))?;
        self.reverse(event).await
    }

    /// Top `n` people by points. Negative `n` is sign-flipped, not rejected.
    pub async fn rank_top(&self, n: i64) -> Result<Vec<RankEntry>> {
        let limit = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
        let people = self.store.top_persons_by_points(limit).await?;
        Ok(people
            .into_iter()
            .enumerate()
            .map(|(index, person)| RankEntry {
                position: index + 1,
                id: person.id,
                name: person.name,
                email: person.email,
                points: person.points,
            })
            .collect())
    }

    /// Compare the stored total with the sum of the person's events.
    pub async fn validate_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        let person = self.resolve(identifier).await?;
        self.check_balance(person).await
    }

    /// Like [`validate_balance`](Self::validate_balance), but overwrite a
    /// diverged stored total with the recomputed sum.
    pub async fn recompute_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        let person = self.resolve(identifier).await?;
        let mut check = self.check_balance(person).await?;
        if check.is_consistent() {
            return Ok(check);
        }

        let mut person = self
            .store
            .find_person_by_id(check.person.id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("person {}", check.person.id)))?;
        person.points = check.recomputed;
        self.store.save_person(&person).await?;

        info!(
            email = %person.email,
            from = check.stored,
            to = check.recomputed,
            "Repaired stored points"
        );
        check.person.points = check.recomputed;
        check.repaired = true;
        Ok(check)
    }

    async fn resolve(&self, identifier: &str) -> Result<Person> {
        let reference = PersonRef::parse(identifier)
            .ok_or_else(|| EngineError::Validation("person identifier must not be empty".into()))?;
        let found = match &reference {
            PersonRef::Id(id) => self.store.find_person_by_id(*id).await?,
            PersonRef::Email(email) => self.store.find_person_by_email(email).await?,
        };
        found.ok_or_else(|| match reference {
            PersonRef::Id(id) => EngineError::NotFound(format!("person {id}")),
            PersonRef::Email(email) => EngineError::NotFound(format!("person {email}")),
        })
    }

    /// Second phase of an inspection read: turn raw participant ids into
    /// records, failing on any id that no longer resolves.
    async fn resolve_participants(
        &self,
        subject: &Person,
        events: &[Event],
    ) -> Result<HashMap<PersonId, Person>> {
        let mut roster = HashMap::new();
        let mut seen = HashSet::from([subject.id]);
        for event in events {
            for id in &event.people {
                if !seen.insert(*id) {
                    continue;
                }
                match self.store.find_person_by_id(*id).await? {
                    Some(person) => {
                        roster.insert(*id, person);
                    }
                    None => {
                        return Err(EngineError::DanglingReference {
                            event: event.id,
                            person: *id,
                        });
                    }
                }
            }
        }
        Ok(roster)
    }

    async fn check_balance(&self, person: Person) -> Result<BalanceCheck> {
        let events = self.store.find_events_by_participant(person.id).await?;
        let recomputed = events
            .iter()
            .fold(0i64, |sum, event| sum.saturating_add(event.points));
        let check = BalanceCheck {
            stored: person.points,
            recomputed,
            event_count: events.len(),
            consistent: person.points == recomputed,
            repaired: false,
            person: person.into(),
        };
        if !check.is_consistent() {
            warn!(
                email = %check.person.email,
                stored = check.stored,
                recomputed,
                "Stored points do not match event history"
            );
            self.metrics.consistency_warning();
        }
        Ok(check)
    }

    /// Debit every participant, then delete the event record.
    ///
    /// A participant that cannot be debited does not stop the others or the
    /// delete; it is reported in the resulting partial failure.
    async fn reverse(&self, event: Event) -> Result<EventSummary> {
        let delta = event.points.checked_neg().ok_or_else(|| {
            EngineError::Validation(format!("event {} cannot be reversed", event.id))
        })?;

        let mut debited = Vec::with_capacity(event.people.len());
        let mut failed = Vec::new();
        for id in &event.people {
            match self.store.adjust_points(*id, delta).await {
                Ok(Some(person)) => debited.push(person),
                Ok(None) => failed.push(ParticipantFailure {
                    participant: id.to_string(),
                    reason: "person record is missing".into(),
                }),
                Err(err) => failed.push(ParticipantFailure {
                    participant: id.to_string(),
                    reason: EngineError::from(err).to_string(),
                }),
            }
        }

        let (event_recorded, event_error) = match self.store.delete_event(event.id).await {
            Ok(true) => (false, None),
            Ok(false) => (false, Some("event record was already deleted".to_string())),
            Err(err) => (true, Some(err.to_string())),
        };

        if failed.is_empty() && event_error.is_none() {
            self.metrics.event_removed();
            info!(event_id = %event.id, name = %event.name, "Removed event");
            return Ok(summarize(&event, debited));
        }

        let partial = PartialFailure {
            operation: LedgerOperation::Reverse,
            event_name: event.name.clone(),
            points: event.points,
            event_id: Some(event.id),
            event_recorded,
            completed: debited.iter().map(|p| p.email.clone()).collect(),
            failed,
            skipped: Vec::new(),
            event_error,
        };
        Err(self.partial(partial))
    }

    fn partial(&self, partial: PartialFailure) -> EngineError {
        self.metrics.partial_failure();
        warn!(
            operation = %partial.operation,
            event = %partial.event_name,
            completed = ?partial.completed,
            failed = ?partial.failed,
            skipped = ?partial.skipped,
            "Ledger operation stopped partway"
        );
        EngineError::PartialApplication(Box::new(partial))
    }
}

/// Trim and lowercase participant emails, rejecting empty or repeated ones.
fn normalize_participants(emails: &[String]) -> Result<Vec<String>> {
    if emails.is_empty() {
        return Err(EngineError::Validation(
            "an adjustment needs at least one participant".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(emails.len());
    for email in emails {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(EngineError::Validation(
                "check the emails; one of them is empty".into(),
            ));
        }
        if !seen.insert(email.clone()) {
            return Err(EngineError::Validation(format!(
                "email \"{email}\" is listed more than once"
            )));
        }
        normalized.push(email);
    }
    Ok(normalized)
}

fn summarize(event: &Event, participants: Vec<Person>) -> EventSummary {
    EventSummary {
        id: event.id,
        name: event.name.clone(),
        points: event.points,
        created_at: event.created_at,
        participants: participants.into_iter().map(PersonEntry::from).collect(),
    }
}
