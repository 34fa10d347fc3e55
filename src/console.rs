//! Terminal front end: opens the ledger and renders results

use std::io::{self, Write};
use std::sync::Arc;

use scorekeeper::client::RemoteClient;
use scorekeeper::config::{Config, SECRET_ENV_VAR};
use scorekeeper::engine::{
    BalanceCheck, EngineError, EventSummary, LedgerEngine, PartialFailure, PersonEntry,
    PersonReport, RankEntry,
};
use scorekeeper::humanize::format_timestamp;
use scorekeeper::ledger::FjallStore;
use scorekeeper::service::LedgerService;
use tracing::{debug, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A ledger handle for one CLI invocation.
pub struct Session {
    pub ledger: Arc<dyn LedgerService>,
    store: Option<FjallStore>,
}

impl Session {
    /// Remote when `--remote` or `remote.endpoint` is set, local store otherwise.
    pub fn open(config: &Config, remote: Option<String>) -> Result<Self, AnyError> {
        if let Some(endpoint) = remote.or_else(|| config.remote.endpoint.clone()) {
            let secret = config
                .auth
                .shared_secret
                .clone()
                .ok_or_else(|| format!("{SECRET_ENV_VAR} must be set to use a remote ledger"))?;
            let client = RemoteClient::new(&endpoint, secret, config.remote.timeout.as_duration())?;
            debug!(endpoint = %client.endpoint(), "Using remote ledger");
            return Ok(Self {
                ledger: Arc::new(client),
                store: None,
            });
        }

        debug!(path = %config.store.path.display(), "Opening local ledger");
        let store = FjallStore::open(&config.store.path)?;
        let engine = LedgerEngine::new(Arc::new(store.clone()));
        Ok(Self {
            ledger: Arc::new(engine),
            store: Some(store),
        })
    }

    /// Flush local writes to disk. No-op in remote mode.
    pub fn close(self) {
        if let Some(store) = self.store {
            if let Err(err) = store.persist() {
                warn!(error = %err, "Failed to flush ledger");
            }
        }
    }
}

fn person_line(person: &PersonEntry) -> String {
    format!("{} <{}>", person.name, person.email)
}

pub fn render_person(out: &mut impl Write, person: &PersonEntry) -> io::Result<()> {
    writeln!(out, "{} ({} points) id {}", person_line(person), person.points, person.id)
}

pub fn render_people(out: &mut impl Write, people: &[PersonEntry]) -> io::Result<()> {
    if people.is_empty() {
        return writeln!(out, "Nobody is enrolled yet.");
    }
    for person in people {
        writeln!(out, "  {:>6}  {}", person.points, person_line(person))?;
    }
    Ok(())
}

pub fn render_summary(out: &mut impl Write, verb: &str, event: &EventSummary) -> io::Result<()> {
    writeln!(
        out,
        "{verb} \"{}\" ({:+} points) on {}",
        event.name,
        event.points,
        format_timestamp(event.created_at)
    )?;
    writeln!(out, "  event id {}", event.id)?;
    for person in &event.participants {
        writeln!(out, "  {} now has {} points", person_line(person), person.points)?;
    }
    Ok(())
}

pub fn render_report(out: &mut impl Write, report: &PersonReport) -> io::Result<()> {
    writeln!(
        out,
        "{} has {} points",
        person_line(&report.person),
        report.person.points
    )?;
    if let Some(warning) = &report.warning {
        writeln!(out, "WARNING: {warning}")?;
    }
    if report.events.is_empty() {
        return writeln!(out, "No events recorded.");
    }
    for event in &report.events {
        writeln!(
            out,
            "  {:+} \"{}\" on {}",
            event.points,
            event.name,
            format_timestamp(event.created_at)
        )?;
        if !event.with.is_empty() {
            let others: Vec<String> = event.with.iter().map(person_line).collect();
            writeln!(out, "      with {}", others.join(", "))?;
        }
        writeln!(out, "      id {}", event.id)?;
    }
    Ok(())
}

pub fn render_rank(out: &mut impl Write, entries: &[RankEntry]) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "Nobody is enrolled yet.");
    }
    for entry in entries {
        writeln!(
            out,
            "{:>3}. {:>6}  {} <{}>",
            entry.position, entry.points, entry.name, entry.email
        )?;
    }
    Ok(())
}

pub fn render_balance(out: &mut impl Write, check: &BalanceCheck) -> io::Result<()> {
    let who = person_line(&check.person);
    if check.repaired {
        writeln!(
            out,
            "Repaired {who}: stored {} -> {} from {} events",
            check.stored, check.recomputed, check.event_count
        )
    } else if check.is_consistent() {
        writeln!(
            out,
            "{who} is consistent: {} points across {} events",
            check.stored, check.event_count
        )
    } else {
        writeln!(
            out,
            "{who} is NOT consistent: stored {}, events sum to {} ({} events)",
            check.stored, check.recomputed, check.event_count
        )
    }
}

fn render_partial(out: &mut impl Write, partial: &PartialFailure) -> io::Result<()> {
    writeln!(out, "error: {partial}")?;
    for email in &partial.completed {
        writeln!(out, "  done     {email}")?;
    }
    for failure in &partial.failed {
        writeln!(out, "  failed   {}: {}", failure.participant, failure.reason)?;
    }
    for email in &partial.skipped {
        writeln!(out, "  skipped  {email}")?;
    }
    if let Some(err) = &partial.event_error {
        writeln!(out, "  event record: {err}")?;
    }
    if let Some(id) = partial.event_id {
        let state = if partial.event_recorded { "still recorded" } else { "deleted" };
        writeln!(out, "  event {id} is {state}")?;
    }
    writeln!(
        out,
        "Run `scorekeeper balance check` on the people above to confirm their totals."
    )
}

pub fn render_error(out: &mut impl Write, err: &EngineError) -> io::Result<()> {
    match err.partial() {
        Some(partial) => render_partial(out, partial),
        None => writeln!(out, "error: {err}"),
    }
}
