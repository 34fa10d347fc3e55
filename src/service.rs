//! One interface over a local engine and a remote ledger server

use async_trait::async_trait;

use crate::engine::{
    BalanceCheck, EventSummary, LedgerEngine, PersonEntry, PersonReport, RankEntry, Result,
};
use crate::ledger::{EventId, LedgerStore};

/// Everything a front end can ask of the ledger.
///
/// Implemented by [`LedgerEngine`] for direct store access and by
/// [`RemoteClient`](crate::client::RemoteClient) for talking to `scorekeeper serve`.
/// Both report failures with the same [`EngineError`](crate::engine::EngineError)
/// taxonomy.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn register_person(&self, name: &str, email: &str) -> Result<PersonEntry>;

    async fn rename_person(&self, email: &str, new_name: &str) -> Result<bool>;

    async fn list_people(&self) -> Result<Vec<PersonEntry>>;

    async fn apply_adjustment(
        &self,
        name: &str,
        emails: &[String],
        points: i64,
    ) -> Result<EventSummary>;

    async fn inspect_person(&self, identifier: &str) -> Result<PersonReport>;

    async fn remove_event(&self, id: EventId) -> Result<EventSummary>;

    async fn remove_most_recent_event(&self) -> Result<EventSummary>;

    async fn rank_top(&self, n: i64) -> Result<Vec<RankEntry>>;

    async fn validate_balance(&self, identifier: &str) -> Result<BalanceCheck>;

    async fn recompute_balance(&self, identifier: &str) -> Result<BalanceCheck>;
}

#[async_trait]
impl<S: LedgerStore + 'static> LedgerService for LedgerEngine<S> {
    async fn register_person(&self, name: &str, email: &str) -> Result<PersonEntry> {
        LedgerEngine::register_person(self, name, email)
            .await
            .map(PersonEntry::from)
    }

    async fn rename_person(&self, email: &str, new_name: &str) -> Result<bool> {
        LedgerEngine::rename_person(self, email, new_name).await
    }

    async fn list_people(&self) -> Result<Vec<PersonEntry>> {
        LedgerEngine::list_people(self).await
    }

    async fn apply_adjustment(
        &self,
        name: &str,
        emails: &[String],
        points: i64,
    ) -> Result<EventSummary> {
        LedgerEngine::apply_adjustment(self, name, emails, points).await
    }

    async fn inspect_person(&self, identifier: &str) -> Result<PersonReport> {
        LedgerEngine::inspect_person(self, identifier).await
    }

    async fn remove_event(&self, id: EventId) -> Result<EventSummary> {
        LedgerEngine::remove_event(self, id).await
    }

    async fn remove_most_recent_event(&self) -> Result<EventSummary> {
        LedgerEngine::remove_most_recent_event(self).await
    }

    async fn rank_top(&self, n: i64) -> Result<Vec<RankEntry>> {
        LedgerEngine::rank_top(self, n).await
    }

    async fn validate_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        LedgerEngine::validate_balance(self, identifier).await
    }

    async fn recompute_balance(&self, identifier: &str) -> Result<BalanceCheck> {
        LedgerEngine::recompute_balance(self, identifier).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::MemoryStore;

    #[tokio::test]
    async fn engine_is_usable_as_trait_object() {
        let service: Arc<dyn LedgerService> =
            Arc::new(LedgerEngine::new(Arc::new(MemoryStore::new())));

        let person = service.register_person("A", "a@example.com").await.unwrap();
        assert_eq!(person.points, 0);

        service
            .apply_adjustment("E", &["a@example.com".to_string()], 3)
            .await
            .unwrap();
        let top = service.rank_top(1).await.unwrap();
        assert_eq!(top[0].points, 3);
        assert_eq!(top[0].position, 1);
    }
}
