//! Tests for FileStore
//!
//! Verifies durability across reopen, delete semantics, and corruption
//! detection on load.

use std::fs;

use stagekv::store::{FileStore, PersistentMap};
use stagekv::StageError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn store_path(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join("test_store.db")
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(&store_path(&temp_dir)).unwrap();

    assert!(store.is_empty());
    assert_eq!(store.get("anything"), None);
}

#[test]
fn test_set_and_get() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(&store_path(&temp_dir)).unwrap();

    store.set("k", b"value").unwrap();

    assert_eq!(store.get("k").as_deref(), Some(b"value".as_slice()));
    assert!(store.contains("k"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_set_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(&store_path(&temp_dir)).unwrap();

    store.set("k", b"one").unwrap();
    store.set("k", b"two").unwrap();

    assert_eq!(store.get("k").as_deref(), Some(b"two".as_slice()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_delete_reports_presence() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(&store_path(&temp_dir)).unwrap();

    store.set("k", b"value").unwrap();

    assert!(store.delete("k").unwrap());
    assert!(!store.contains("k"));

    // Deleting an absent key is a no-op, not an error
    assert!(!store.delete("k").unwrap());
    assert!(!store.delete("never_existed").unwrap());
}

#[test]
fn test_entries_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(&store_path(&temp_dir)).unwrap();

    store.set("b", b"2").unwrap();
    store.set("a", b"1").unwrap();

    let entries = store.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.contains(&("a".to_string(), b"1".to_vec())));
    assert!(entries.contains(&("b".to_string(), b"2".to_vec())));
}

// =============================================================================
// Durability Tests
// =============================================================================

#[test]
fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);

    {
        let mut store = FileStore::open(&path).unwrap();
        store.set("k1", b"v1").unwrap();
        store.set("k2", b"v2").unwrap();
        store.delete("k1").unwrap();
        store.close().unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get("k1"), None);
    assert_eq!(store.get("k2").as_deref(), Some(b"v2".as_slice()));
}

#[test]
fn test_mutations_durable_without_close() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);

    // Each mutation persists immediately; dropping without close loses
    // nothing
    {
        let mut store = FileStore::open(&path).unwrap();
        store.set("k", b"value").unwrap();
        drop(store);
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get("k").as_deref(), Some(b"value".as_slice()));
}

#[test]
fn test_binary_values_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);

    let value = [0x00u8, 0xFF, 0x01, 0xFE, 0x00];
    {
        let mut store = FileStore::open(&path).unwrap();
        store.set("bin", &value).unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get("bin").as_deref(), Some(value.as_slice()));
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_empty_file_is_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    fs::write(&path, b"").unwrap();

    let store = FileStore::open(&path).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_bad_magic_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    fs::write(&path, b"XXXX0000000000garbage").unwrap();

    assert!(matches!(
        FileStore::open(&path),
        Err(StageError::StoreCorruption(_))
    ));
}

#[test]
fn test_flipped_payload_byte_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);

    {
        let mut store = FileStore::open(&path).unwrap();
        store.set("k", b"value").unwrap();
    }

    // Corrupt the last payload byte; the CRC check must catch it
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        FileStore::open(&path),
        Err(StageError::StoreCorruption(_))
    ));
}

#[test]
fn test_truncated_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    fs::write(&path, b"SKV1").unwrap();

    assert!(matches!(
        FileStore::open(&path),
        Err(StageError::StoreCorruption(_))
    ));
}
