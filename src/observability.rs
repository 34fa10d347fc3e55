//! Tracing setup and ledger counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_directive`. Output goes to stderr so command
/// results on stdout stay machine-readable.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Metrics handle for recording ledger counters
#[derive(Debug, Default)]
pub struct Metrics {
    events_applied: AtomicU64,
    events_removed: AtomicU64,
    partial_failures: AtomicU64,
    consistency_warnings: AtomicU64,
    requests_rejected: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "events_applied", "Metric incremented");
    }

    pub fn event_removed(&self) {
        self.events_removed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "events_removed", "Metric incremented");
    }

    pub fn partial_failure(&self) {
        self.partial_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "partial_failures", "Metric incremented");
    }

    pub fn consistency_warning(&self) {
        self.consistency_warnings.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "consistency_warnings", "Metric incremented");
    }

    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_rejected", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_applied: self.events_applied.load(Ordering::Relaxed),
            events_removed: self.events_removed.load(Ordering::Relaxed),
            partial_failures: self.partial_failures.load(Ordering::Relaxed),
            consistency_warnings: self.consistency_warnings.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_applied: u64,
    pub events_removed: u64,
    pub partial_failures: u64,
    pub consistency_warnings: u64,
    pub requests_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = Metrics::new();
        metrics.event_applied();
        metrics.event_applied();
        metrics.consistency_warning();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_applied, 2);
        assert_eq!(snapshot.consistency_warnings, 1);
        assert_eq!(snapshot.events_removed, 0);
    }
}
