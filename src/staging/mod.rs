//! Staging Module
//!
//! In-memory buffer of pending mutations awaiting commit.
//!
//! ## Responsibilities
//! - Hold at most one pending mutation per key
//! - Preserve insertion order for the commit drain
//! - Distinguish add/update from delete
//!
//! ## Data Structure Choice
//! A HashMap from key to its single pending mutation, with a separate
//! insertion-order index. Upsert and delete are O(1); the linear
//! scan-and-remove a naive pending list would need is avoided.

mod buffer;

pub use buffer::StagingBuffer;

/// What a pending mutation does to its key at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Insert or overwrite the key
    Add,

    /// Remove the key
    Delete,
}

/// A single uncommitted mutation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    /// Target key, unique within the buffer
    pub key: String,

    /// Value bytes: the new value for `Add`, the persisted value found at
    /// staging time for `Delete` (kept for reporting)
    pub value: Option<Vec<u8>>,

    /// Add-or-update vs delete
    pub kind: MutationKind,
}

impl PendingMutation {
    /// Whether this mutation adds or updates its key
    pub fn is_add(&self) -> bool {
        self.kind == MutationKind::Add
    }

    /// Whether this mutation deletes its key
    pub fn is_delete(&self) -> bool {
        self.kind == MutationKind::Delete
    }
}
