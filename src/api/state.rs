use std::sync::Arc;

use crate::auth::{RequestVerifier, SharedSecret};
use crate::config::Config;
use crate::observability::Metrics;
use crate::service::LedgerService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: Arc<dyn LedgerService>,
    pub verifier: Arc<RequestVerifier>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        ledger: Arc<dyn LedgerService>,
        secret: SharedSecret,
        metrics: Arc<Metrics>,
    ) -> Self {
        let verifier = RequestVerifier::new(
            secret,
            config.auth.max_clock_skew.as_duration(),
            config.auth.nonce_ttl.as_duration(),
        );
        Self {
            config: Arc::new(config),
            ledger,
            verifier: Arc::new(verifier),
            metrics,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.config.server.max_body_bytes.as_usize()
    }
}
