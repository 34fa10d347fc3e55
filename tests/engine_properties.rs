//! Ledger engine behavior against both store backends.

use std::sync::Arc;

use tempfile::TempDir;

use scorekeeper::engine::{EngineError, LedgerEngine, LedgerOperation};
use scorekeeper::ledger::{FjallStore, LedgerStore, MemoryStore};

fn emails(list: &[&str]) -> Vec<String> {
    list.iter().map(|e| e.to_string()).collect()
}

fn fjall_engine() -> (LedgerEngine<FjallStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = FjallStore::open(temp_dir.path().join("ledger")).expect("Failed to open store");
    (LedgerEngine::new(Arc::new(store)), temp_dir)
}

fn memory_engine() -> LedgerEngine<MemoryStore> {
    LedgerEngine::new(Arc::new(MemoryStore::new()))
}

async fn points_of<S: LedgerStore>(engine: &LedgerEngine<S>, email: &str) -> i64 {
    engine
        .store()
        .find_person_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .points
}

async fn assert_balanced<S: LedgerStore>(engine: &LedgerEngine<S>) {
    for person in engine.list_people().await.unwrap() {
        let check = engine.validate_balance(&person.email).await.unwrap();
        assert!(
            check.is_consistent(),
            "{} stored {} but events sum to {}",
            person.email,
            check.stored,
            check.recomputed
        );
    }
}

async fn balance_invariant<S: LedgerStore>(engine: LedgerEngine<S>) {
    for (name, email) in [("A", "a@example.com"), ("B", "b@example.com"), ("C", "c@example.com")] {
        engine.register_person(name, email).await.unwrap();
    }

    let first = engine
        .apply_adjustment("one", &emails(&["a@example.com", "b@example.com"]), 10)
        .await
        .unwrap();
    engine
        .apply_adjustment("two", &emails(&["b@example.com", "c@example.com"]), -4)
        .await
        .unwrap();
    engine
        .apply_adjustment("three", &emails(&["c@example.com"]), 7)
        .await
        .unwrap();
    assert_balanced(&engine).await;

    engine.remove_event(first.id).await.unwrap();
    assert_balanced(&engine).await;

    engine.remove_most_recent_event().await.unwrap();
    assert_balanced(&engine).await;

    assert_eq!(points_of(&engine, "a@example.com").await, 0);
    assert_eq!(points_of(&engine, "b@example.com").await, -4);
    assert_eq!(points_of(&engine, "c@example.com").await, -4);
}

#[tokio::test]
async fn test_balance_invariant_fjall() {
    let (engine, _dir) = fjall_engine();
    balance_invariant(engine).await;
}

#[tokio::test]
async fn test_balance_invariant_memory() {
    balance_invariant(memory_engine()).await;
}

async fn round_trip<S: LedgerStore>(engine: LedgerEngine<S>) {
    engine.register_person("A", "a@example.com").await.unwrap();
    engine.register_person("B", "b@example.com").await.unwrap();
    engine
        .apply_adjustment("warmup", &emails(&["a@example.com"]), 3)
        .await
        .unwrap();

    let e1 = engine
        .apply_adjustment("E1", &emails(&["a@example.com", "b@example.com"]), 10)
        .await
        .unwrap();
    assert_eq!(points_of(&engine, "a@example.com").await, 13);

    let removed = engine.remove_event(e1.id).await.unwrap();
    assert_eq!(removed.id, e1.id);
    assert_eq!(points_of(&engine, "a@example.com").await, 3);
    assert_eq!(points_of(&engine, "b@example.com").await, 0);

    let a = engine
        .store()
        .find_person_by_email("a@example.com")
        .await
        .unwrap()
        .unwrap();
    let events = engine.store().find_events_by_participant(a.id).await.unwrap();
    assert!(events.iter().all(|event| event.id != e1.id));
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_round_trip_fjall() {
    let (engine, _dir) = fjall_engine();
    round_trip(engine).await;
}

#[tokio::test]
async fn test_round_trip_memory() {
    round_trip(memory_engine()).await;
}

#[tokio::test]
async fn test_inspection_is_idempotent() {
    let (engine, _dir) = fjall_engine();
    engine.register_person("A", "a@example.com").await.unwrap();
    engine.register_person("B", "b@example.com").await.unwrap();
    engine
        .apply_adjustment("E", &emails(&["a@example.com", "b@example.com"]), 2)
        .await
        .unwrap();

    let first = engine.inspect_person("a@example.com").await.unwrap();
    let second = engine.inspect_person("a@example.com").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_duplicate_email_rejected_and_first_unchanged() {
    let (engine, _dir) = fjall_engine();
    let first = engine.register_person("A", "x@example.com").await.unwrap();

    let err = engine
        .register_person("B", "X@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateIdentity(_)));

    let people = engine.list_people().await.unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].id, first.id);
    assert_eq!(people[0].name, "A");
}

#[tokio::test]
async fn test_unknown_participant_changes_nothing() {
    let (engine, _dir) = fjall_engine();
    engine.register_person("A", "a@example.com").await.unwrap();

    let err = engine
        .apply_adjustment("E2", &emails(&["ghost@example.com"]), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert!(engine.store().find_most_recent_event().await.unwrap().is_none());
    assert_eq!(points_of(&engine, "a@example.com").await, 0);
    assert_eq!(engine.store().stats().unwrap().event_count, 0);
}

#[tokio::test]
async fn test_ranking_is_deterministic() {
    let (engine, _dir) = fjall_engine();
    let people = [
        ("P0", "p0@example.com", 30),
        ("P1", "p1@example.com", 10),
        ("P2", "p2@example.com", 30),
        ("P3", "p3@example.com", 5),
    ];
    for (name, email, points) in people {
        engine.register_person(name, email).await.unwrap();
        engine
            .apply_adjustment("seed", &emails(&[email]), points)
            .await
            .unwrap();
    }

    let top = engine.rank_top(2).await.unwrap();
    let names: Vec<&str> = top.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["P0", "P2"]);
    assert_eq!(top[0].position, 1);
    assert_eq!(top[1].position, 2);
    assert_eq!(engine.rank_top(2).await.unwrap(), top);

    assert!(engine.rank_top(0).await.unwrap().is_empty());
    assert_eq!(engine.rank_top(-2).await.unwrap(), top);
    assert_eq!(engine.rank_top(i64::MIN).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_partial_failure_names_mutated_participants() {
    let (engine, _dir) = fjall_engine();
    engine.register_person("A", "a@example.com").await.unwrap();

    let err = engine
        .apply_adjustment("E3", &emails(&["a@example.com", "ghost@example.com"]), 5)
        .await
        .unwrap_err();

    let partial = err.partial().expect("partial application");
    assert_eq!(partial.operation, LedgerOperation::Apply);
    assert_eq!(partial.completed, vec!["a@example.com".to_string()]);
    assert_eq!(partial.failed.len(), 1);
    assert_eq!(partial.failed[0].participant, "ghost@example.com");
    assert!(partial.skipped.is_empty());
    assert!(!partial.event_recorded);

    assert_eq!(points_of(&engine, "a@example.com").await, 5);

    // The stranded credit shows up as a consistency warning until repaired.
    let report = engine.inspect_person("a@example.com").await.unwrap();
    assert!(report.warning.is_some());
    let repaired = engine.recompute_balance("a@example.com").await.unwrap();
    assert!(repaired.repaired);
    assert_eq!(points_of(&engine, "a@example.com").await, 0);
}

#[tokio::test]
async fn test_reverse_with_purged_participant_is_partial() {
    let engine = memory_engine();
    engine.register_person("A", "a@example.com").await.unwrap();
    let b = engine.register_person("B", "b@example.com").await.unwrap();
    let event = engine
        .apply_adjustment("E", &emails(&["a@example.com", "b@example.com"]), 4)
        .await
        .unwrap();

    engine.store().purge_person(b.id).unwrap();

    let err = engine.remove_event(event.id).await.unwrap_err();
    let partial = err.partial().expect("partial reverse");
    assert_eq!(partial.operation, LedgerOperation::Reverse);
    assert_eq!(partial.event_id, Some(event.id));
    assert_eq!(partial.completed, vec!["a@example.com".to_string()]);
    assert_eq!(partial.failed[0].participant, b.id.to_string());
    assert_eq!(engine.metrics().snapshot().partial_failures, 1);
}
