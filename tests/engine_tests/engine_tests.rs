//! Tests for Engine
//!
//! These tests verify:
//! - Reads reflect committed state only (no dirty reads)
//! - Single-key-per-stage-call contract
//! - Last-write-wins within a staging epoch
//! - Commit drain-and-apply semantics
//! - Engine lifecycle (open/close, with and without a final commit)

use serde_json::{json, Map, Value};
use stagekv::config::Config;
use stagekv::engine::{Engine, StageOutcome};
use stagekv::store::FileStore;
use stagekv::StageError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine<FileStore>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn reopen_engine(temp_dir: &TempDir) -> Engine<FileStore> {
    let config = Config::builder().data_dir(temp_dir.path()).build();
    Engine::open(config).unwrap()
}

fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert(key.to_string(), value);
    data
}

// =============================================================================
// Read Semantics Tests
// =============================================================================

#[test]
fn test_get_unset_key_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(engine.get("missing"), Err(StageError::KeyNotFound)));
}

#[test]
fn test_reads_ignore_pending_state() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!(42))).unwrap();

    // The staged write is not observable until commit
    assert!(matches!(engine.get("k"), Err(StageError::KeyNotFound)));
    assert_eq!(engine.pending_count(), 1);

    engine.commit().unwrap();
    assert_eq!(engine.get("k").unwrap(), json!(42));
}

// =============================================================================
// Staging Tests
// =============================================================================

#[test]
fn test_stage_set_reports_insert_vs_update() {
    let (_temp, engine) = setup_temp_engine();

    // New key: insert, even before commit
    let outcome = engine.stage_set(&single("k", json!(1))).unwrap();
    assert_eq!(outcome, StageOutcome::Inserted);

    // Re-staging the same uncommitted key is still an insert — the key is
    // not yet persisted
    let outcome = engine.stage_set(&single("k", json!(2))).unwrap();
    assert_eq!(outcome, StageOutcome::Inserted);

    engine.commit().unwrap();

    // Once persisted, staging reports an update
    let outcome = engine.stage_set(&single("k", json!(3))).unwrap();
    assert_eq!(outcome, StageOutcome::Updated);
}

#[test]
fn test_stage_set_rejects_multiple_keys() {
    let (_temp, engine) = setup_temp_engine();

    let mut data = Map::new();
    data.insert("a".to_string(), json!(1));
    data.insert("b".to_string(), json!(2));

    assert!(matches!(
        engine.stage_set(&data),
        Err(StageError::TooManyKeys)
    ));

    // Nothing was staged
    assert_eq!(engine.pending_count(), 0);
    engine.commit().unwrap();
    assert!(matches!(engine.get("a"), Err(StageError::KeyNotFound)));
    assert!(matches!(engine.get("b"), Err(StageError::KeyNotFound)));
}

#[test]
fn test_stage_set_rejects_empty_payload() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.stage_set(&Map::new()),
        Err(StageError::Processing(_))
    ));
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn test_stage_set_rejects_empty_key() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.stage_set(&single("", json!(1))),
        Err(StageError::Processing(_))
    ));
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn test_last_write_wins_within_epoch() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!(1))).unwrap();
    engine.stage_set(&single("k", json!(2))).unwrap();

    // Deduplicated: one pending mutation for the key
    assert_eq!(engine.pending_count(), 1);

    assert_eq!(engine.commit().unwrap(), 1);
    assert_eq!(engine.get("k").unwrap(), json!(2));
}

#[test]
fn test_stage_delete_unknown_key() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.stage_delete("missing"),
        Err(StageError::KeyNotFound)
    ));

    // Nothing staged, commit has no effect on the key
    assert_eq!(engine.pending_count(), 0);
    assert_eq!(engine.commit().unwrap(), 0);
}

#[test]
fn test_stage_delete_of_uncommitted_key_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    // Staged but not persisted: delete_data consults the store only
    engine.stage_set(&single("k", json!(1))).unwrap();
    assert!(matches!(
        engine.stage_delete("k"),
        Err(StageError::KeyNotFound)
    ));
}

#[test]
fn test_stage_delete_returns_persisted_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!("hello"))).unwrap();
    engine.commit().unwrap();

    assert_eq!(engine.stage_delete("k").unwrap(), json!("hello"));

    // Delete is pending, not applied
    assert_eq!(engine.get("k").unwrap(), json!("hello"));
}

#[test]
fn test_stage_set_supersedes_pending_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!(1))).unwrap();
    engine.commit().unwrap();

    engine.stage_delete("k").unwrap();
    engine.stage_set(&single("k", json!(2))).unwrap();
    assert_eq!(engine.pending_count(), 1);

    engine.commit().unwrap();
    assert_eq!(engine.get("k").unwrap(), json!(2));
}

// =============================================================================
// Commit Tests
// =============================================================================

#[test]
fn test_insert_commit_delete_commit_round_trip() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!(5))).unwrap();
    assert_eq!(engine.commit().unwrap(), 1);
    assert_eq!(engine.get("k").unwrap(), json!(5));

    engine.stage_delete("k").unwrap();
    assert_eq!(engine.commit().unwrap(), 1);
    assert!(matches!(engine.get("k"), Err(StageError::KeyNotFound)));
}

#[test]
fn test_commit_is_idempotent() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("k", json!(1))).unwrap();
    assert_eq!(engine.commit().unwrap(), 1);

    // Nothing staged between calls: a no-op, not an error
    assert_eq!(engine.commit().unwrap(), 0);
    assert_eq!(engine.get("k").unwrap(), json!(1));
}

#[test]
fn test_commit_applies_mixed_mutations() {
    let (_temp, engine) = setup_temp_engine();

    engine.stage_set(&single("a", json!(1))).unwrap();
    engine.stage_set(&single("b", json!(2))).unwrap();
    engine.commit().unwrap();

    engine.stage_delete("a").unwrap();
    engine.stage_set(&single("b", json!(20))).unwrap();
    engine.stage_set(&single("c", json!(3))).unwrap();
    assert_eq!(engine.commit().unwrap(), 3);

    assert!(matches!(engine.get("a"), Err(StageError::KeyNotFound)));
    assert_eq!(engine.get("b").unwrap(), json!(20));
    assert_eq!(engine.get("c").unwrap(), json!(3));
}

#[test]
fn test_commit_preserves_json_shapes() {
    let (_temp, engine) = setup_temp_engine();

    let value = json!({ "nested": [1, 2, 3], "flag": true, "name": "x" });
    engine.stage_set(&single("doc", value.clone())).unwrap();
    engine.commit().unwrap();

    assert_eq!(engine.get("doc").unwrap(), value);
}

// =============================================================================
// Close/Lifecycle Tests
// =============================================================================

#[test]
fn test_close_with_commit_persists_pending() {
    let temp_dir = TempDir::new().unwrap();

    {
        let config = Config::builder().data_dir(temp_dir.path()).build();
        let engine = Engine::open(config).unwrap();
        engine.stage_set(&single("k", json!(9))).unwrap();
        engine.close(true).unwrap();
    }

    let engine = reopen_engine(&temp_dir);
    assert_eq!(engine.get("k").unwrap(), json!(9));
}

#[test]
fn test_close_without_commit_discards_pending() {
    let temp_dir = TempDir::new().unwrap();

    {
        let config = Config::builder().data_dir(temp_dir.path()).build();
        let engine = Engine::open(config).unwrap();
        engine.stage_set(&single("k", json!(9))).unwrap();
        engine.close(false).unwrap();
    }

    let engine = reopen_engine(&temp_dir);
    assert!(matches!(engine.get("k"), Err(StageError::KeyNotFound)));
}

#[test]
fn test_committed_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let config = Config::builder().data_dir(temp_dir.path()).build();
        let engine = Engine::open(config).unwrap();
        engine.stage_set(&single("a", json!("one"))).unwrap();
        engine.stage_set(&single("b", json!("two"))).unwrap();
        engine.commit().unwrap();
        engine.close(false).unwrap();
    }

    let engine = reopen_engine(&temp_dir);
    assert_eq!(engine.get("a").unwrap(), json!("one"));
    assert_eq!(engine.get("b").unwrap(), json!("two"));
}

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder().data_dir(&data_dir).build();
    let _engine = Engine::open(config).unwrap();

    assert!(data_dir.exists());
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_staging_from_multiple_threads() {
    use std::sync::Arc;
    use std::thread;

    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{}", t, i);
                engine_clone.stage_set(&single(&key, json!(i))).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.pending_count(), 100);
    assert_eq!(engine.commit().unwrap(), 100);

    for t in 0..4 {
        for i in 0..25 {
            let key = format!("thread{}_key{}", t, i);
            assert_eq!(engine.get(&key).unwrap(), json!(i));
        }
    }
}

#[test]
fn test_staging_concurrent_with_commit() {
    use std::sync::Arc;
    use std::thread;

    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..50 {
        engine
            .stage_set(&single(&format!("pre{}", i), json!(i)))
            .unwrap();
    }

    let committer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.commit().unwrap())
    };
    let stager = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..50 {
                engine
                    .stage_set(&single(&format!("post{}", i), json!(i)))
                    .unwrap();
            }
        })
    };

    committer.join().unwrap();
    stager.join().unwrap();

    // Everything staged before or during the commit is either applied or
    // still pending; nothing is lost
    engine.commit().unwrap();
    for i in 0..50 {
        assert_eq!(engine.get(&format!("pre{}", i)).unwrap(), json!(i));
        assert_eq!(engine.get(&format!("post{}", i)).unwrap(), json!(i));
    }
}
