//! Engine Module
//!
//! The single point of coordination between staged writes and the durable
//! store.
//!
//! ## Responsibilities
//! - Route reads straight to the persistent map (committed state only)
//! - Land writes in the staging buffer, never directly in the store
//! - Define the commit algorithm and its failure policy
//! - Manage store lifecycle (open at construction, close at shutdown)

use std::fs;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::config::Config;
use crate::error::{Result, StageError};
use crate::staging::StagingBuffer;
use crate::store::{FileStore, PersistentMap};

/// Outcome of staging a set: whether the key is already persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Key is new to the persistent store
    Inserted,

    /// Key already exists in the persistent store
    Updated,
}

/// The datastore engine
///
/// ## Concurrency Model: Two-Lock Commit
///
/// - **Staging** (stage_set/stage_delete): takes `staging`, then a read lock
///   on `store` (existence checks only — staging never mutates the store)
/// - **Commit**: serialized by `apply_lock`; takes `staging` only for the
///   drain swap, then a write lock on `store` for the persistence pass.
///   New writes can be staged while the (potentially slow) apply runs.
/// - **Reads** (get): read lock on `store`, no staging lock at all
///
/// Lock order is always staging → store, so the two paths cannot deadlock.
pub struct Engine<S: PersistentMap> {
    /// Engine configuration
    config: Config,

    /// Durable backing map; only ever mutated during commit
    store: RwLock<S>,

    /// Pending mutations awaiting commit
    staging: Mutex<StagingBuffer>,

    /// Serializes the apply-to-store phase of commit
    apply_lock: Mutex<()>,
}

impl Engine<FileStore> {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const STORE_FILENAME: &'static str = "stagekv.db";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if it doesn't exist
    /// 2. Open the store snapshot (validated on load)
    /// 3. Ready to serve requests with an empty staging buffer
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let store_path = config.data_dir.join(Self::STORE_FILENAME);
        let store = FileStore::open(&store_path)?;

        tracing::debug!(
            "Opened store at {} with {} persisted entries",
            store_path.display(),
            store.len()
        );

        Ok(Self::with_store(config, store))
    }
}

impl<S: PersistentMap> Engine<S> {
    /// Construct an engine around an already-open persistent map
    pub fn with_store(config: Config, store: S) -> Self {
        Self {
            config,
            store: RwLock::new(store),
            staging: Mutex::new(StagingBuffer::new()),
            apply_lock: Mutex::new(()),
        }
    }

    /// Get the committed value for a key
    ///
    /// Direct passthrough to the persistent store. Pending (uncommitted)
    /// state is deliberately not consulted: a client cannot observe its own
    /// staged write until commit.
    pub fn get(&self, key: &str) -> Result<Value> {
        let bytes = self
            .store
            .read()
            .get(key)
            .ok_or(StageError::KeyNotFound)?;

        serde_json::from_slice(&bytes)
            .map_err(|e| StageError::Serialization(format!("stored value decode failed: {}", e)))
    }

    /// Stage a single key/value pair for insertion or update
    ///
    /// The payload must contain exactly one key: more than one is rejected
    /// with `TooManyKeys` (and nothing is staged), an empty payload or empty
    /// key with `Processing`. The returned outcome reports whether the key is
    /// already persisted, even though the write itself is deferred.
    pub fn stage_set(&self, data: &serde_json::Map<String, Value>) -> Result<StageOutcome> {
        if data.len() > 1 {
            return Err(StageError::TooManyKeys);
        }

        let (key, value) = data
            .iter()
            .next()
            .ok_or_else(|| StageError::Processing("empty set payload".to_string()))?;

        if key.is_empty() {
            return Err(StageError::Processing("empty key".to_string()));
        }

        let bytes = serde_json::to_vec(value)
            .map_err(|e| StageError::Processing(format!("value encode failed: {}", e)))?;

        let mut staging = self.staging.lock();
        let exists = staging.upsert(key.clone(), bytes, &*self.store.read());

        tracing::debug!(
            "Staged set for key '{}' ({} pending)",
            key,
            staging.len()
        );

        Ok(if exists {
            StageOutcome::Updated
        } else {
            StageOutcome::Inserted
        })
    }

    /// Stage a delete for a key
    ///
    /// Returns the persisted value that will be removed at commit, or
    /// `KeyNotFound` — in which case nothing is staged and a later commit
    /// has no effect on the key.
    pub fn stage_delete(&self, key: &str) -> Result<Value> {
        let mut staging = self.staging.lock();
        let bytes = staging
            .mark_delete(key, &*self.store.read())
            .ok_or(StageError::KeyNotFound)?;

        tracing::debug!(
            "Staged delete for key '{}' ({} pending)",
            key,
            staging.len()
        );

        serde_json::from_slice(&bytes)
            .map_err(|e| StageError::Serialization(format!("stored value decode failed: {}", e)))
    }

    /// Apply all pending mutations to the persistent store
    ///
    /// Drains the staging buffer (the buffer is free to accept new staged
    /// writes for the rest of the pass), then applies each mutation in
    /// insertion order: adds overwrite, deletes treat already-absent as
    /// success. A persistence failure on one mutation is logged and that
    /// mutation dropped; the commit continues with the rest.
    ///
    /// Returns the number of mutations processed. With nothing staged this
    /// is a no-op returning 0.
    pub fn commit(&self) -> Result<usize> {
        let _apply_guard = self.apply_lock.lock();

        // Hold the staging lock only for the swap
        let drained = self.staging.lock().drain();
        if drained.is_empty() {
            return Ok(0);
        }

        tracing::info!("Committing {} pending mutations", drained.len());

        let mut store = self.store.write();
        let count = drained.len();

        for mutation in drained {
            if mutation.is_add() {
                let value = mutation.value.as_deref().unwrap_or_default();
                if let Err(e) = store.set(&mutation.key, value) {
                    tracing::error!("Unable to persist key '{}': {}", mutation.key, e);
                }
            } else {
                // A delete racing a prior delete of the same key is not a
                // failure; only real persistence errors are logged and skipped
                match store.delete(&mutation.key) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!("Key '{}' was already removed", mutation.key);
                    }
                    Err(e) => {
                        tracing::error!("Unable to delete key '{}': {}", mutation.key, e);
                    }
                }
            }
        }

        Ok(count)
    }

    /// Close the engine, optionally committing pending mutations first
    ///
    /// Logs every remaining key/value pair (diagnostic dump), then releases
    /// the store. A failed final commit is logged, not propagated — close
    /// always proceeds.
    pub fn close(self, commit_pending: bool) -> Result<()> {
        if commit_pending {
            if let Err(e) = self.commit() {
                tracing::error!("Unable to commit pending mutations on close: {}", e);
            }
        } else {
            let dropped = self.staging.lock().len();
            if dropped > 0 {
                tracing::warn!("Discarding {} pending mutations on close", dropped);
            }
        }

        let store = self.store.into_inner();

        tracing::info!("Store contents at close:");
        for (key, value) in store.entries() {
            tracing::info!("  {}: {}", key, String::from_utf8_lossy(&value));
        }

        store.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of mutations currently staged
    pub fn pending_count(&self) -> usize {
        self.staging.lock().len()
    }

    /// Whether the key currently exists in the persistent store
    pub fn is_persisted(&self, key: &str) -> bool {
        self.store.read().contains(key)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
