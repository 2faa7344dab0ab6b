//! Staging buffer implementation
//!
//! Keyed pending-mutation map with an insertion-order index for the drain.

use std::collections::HashMap;

use crate::store::PersistentMap;

use super::{MutationKind, PendingMutation};

/// Ordered collection of pending mutations, at most one per key.
///
/// Owned exclusively by the engine; callers never see it directly. A key
/// staged more than once keeps its original drain slot — per-key
/// last-write-wins makes cross-key commit order immaterial.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    /// Pending mutation per key
    pending: HashMap<String, PendingMutation>,

    /// Keys in first-staged order. Invariant: exactly the keys of `pending`.
    order: Vec<String>,
}

impl StagingBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an add-or-update for `key`, replacing any prior pending entry.
    ///
    /// Returns whether `key` already exists in the persistent store — the
    /// caller uses this to report update-vs-insert semantics even though the
    /// actual write is deferred to commit.
    pub fn upsert<S: PersistentMap>(&mut self, key: String, value: Vec<u8>, store: &S) -> bool {
        let exists = store.contains(&key);

        if !self.pending.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.pending.insert(
            key.clone(),
            PendingMutation {
                key,
                value: Some(value),
                kind: MutationKind::Add,
            },
        );

        exists
    }

    /// Stage a delete for `key` if it is currently persisted.
    ///
    /// Returns the persisted value (carried on the pending entry for
    /// reporting), or `None` when the key is absent — in which case nothing
    /// is staged.
    pub fn mark_delete<S: PersistentMap>(&mut self, key: &str, store: &S) -> Option<Vec<u8>> {
        let persisted = store.get(key)?;

        if !self.pending.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.pending.insert(
            key.to_string(),
            PendingMutation {
                key: key.to_string(),
                value: Some(persisted.clone()),
                kind: MutationKind::Delete,
            },
        );

        Some(persisted)
    }

    /// Remove and return all pending mutations in insertion order, leaving
    /// the buffer empty. Used exclusively by commit.
    pub fn drain(&mut self) -> Vec<PendingMutation> {
        let order = std::mem::take(&mut self.order);

        order
            .into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .collect()
    }

    /// Number of pending mutations
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a pending mutation exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Peek at the pending mutation for `key`, if any
    pub fn get(&self, key: &str) -> Option<&PendingMutation> {
        self.pending.get(key)
    }
}
