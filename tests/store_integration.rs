//! Integration tests for the file-backed progress store.
//!
//! These tests exercise the durability guarantee across "process restarts"
//! (separate FileStore instances over the same path) and the recovery
//! behavior for absent or corrupt checkpoints.

use std::time::Duration;

use harvester_core::{FileStore, ProgressStore, QueryResult, QuerySpec, RunState};
use tempfile::TempDir;

fn test_spec() -> QuerySpec {
    QuerySpec::new("ab".chars(), 2, Duration::ZERO, 10).expect("valid test spec")
}

fn result_for(query: &str, names: &[&str]) -> QueryResult {
    QueryResult::fetched(
        query,
        names.iter().map(ToString::to_string).collect(),
        10,
        1,
    )
}

#[tokio::test]
async fn test_checkpoint_survives_restart() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("progress.json");

    let mut state = RunState::fresh(&test_spec());
    state.record_completion(result_for("a", &["ann"]));
    state.record_completion(result_for("b", &["bob"]));
    state.touch_saved();

    FileStore::new(&path)
        .checkpoint(&state)
        .await
        .expect("checkpoint succeeds");

    // A freshly started process sees everything that was checkpointed.
    let reloaded = FileStore::new(&path)
        .load()
        .await
        .expect("load succeeds")
        .expect("checkpoint present");

    assert!(reloaded.completed().contains_key("a"));
    assert!(reloaded.completed().contains_key("b"));
    assert_eq!(reloaded.pending(), ["aa", "ab", "ba", "bb"]);
    assert!(reloaded.last_saved() > 0);
}

#[tokio::test]
async fn test_every_checkpoint_is_a_superset_of_the_previous() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("progress.json");
    let store = FileStore::new(&path);
    let spec = test_spec();

    let mut state = RunState::fresh(&spec);
    let mut seen_completed = 0;

    while let Some(query) = state.next_pending() {
        state.record_completion(result_for(&query, &[]));
        state.touch_saved();
        store.checkpoint(&state).await.expect("checkpoint succeeds");

        let reloaded = FileStore::new(&path)
            .load()
            .await
            .expect("load succeeds")
            .expect("checkpoint present");
        assert!(reloaded.completed().len() > seen_completed);
        seen_completed = reloaded.completed().len();
    }

    assert_eq!(seen_completed, 6);
}

#[tokio::test]
async fn test_corrupt_checkpoint_degrades_to_fresh_run() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("progress.json");

    tokio::fs::write(&path, b"\x00\x01 definitely not json")
        .await
        .expect("write garbage");

    let loaded = FileStore::new(&path).load().await.expect("load succeeds");
    assert!(loaded.is_none(), "corruption must read as no checkpoint");
}

#[tokio::test]
async fn test_truncated_checkpoint_degrades_to_fresh_run() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("progress.json");
    let store = FileStore::new(&path);

    let mut state = RunState::fresh(&test_spec());
    state.record_completion(result_for("a", &["ann"]));
    store.checkpoint(&state).await.expect("checkpoint succeeds");

    // Chop the file in half, as if the machine died mid-copy somewhere
    // downstream of the atomic rename.
    let full = tokio::fs::read(&path).await.expect("read checkpoint");
    tokio::fs::write(&path, &full[..full.len() / 2])
        .await
        .expect("write truncated");

    let loaded = store.load().await.expect("load succeeds");
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_loaded_state_reconciles_against_enumeration() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("progress.json");
    let store = FileStore::new(&path);
    let spec = test_spec();

    let mut state = RunState::fresh(&spec);
    state.record_completion(result_for("aa", &["aaron"]));
    store.checkpoint(&state).await.expect("checkpoint succeeds");

    let reloaded = store
        .load()
        .await
        .expect("load succeeds")
        .expect("checkpoint present")
        .reconciled(&spec);

    // Completed stays completed; everything else is pending in enumerator order.
    assert!(reloaded.completed().contains_key("aa"));
    assert_eq!(reloaded.pending(), ["a", "b", "ab", "ba", "bb"]);
}
