//! Store Module
//!
//! Durable key-value map consumed by the engine.
//!
//! ## Responsibilities
//! - Persist committed key/value pairs across restarts
//! - Key-granular read/write/delete plus snapshot iteration
//! - Corruption detection on open
//!
//! ## Snapshot File Format (V1 - Simple)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header                                 │
//! │ ┌──────────┬──────────┬──────────────┐ │
//! │ │Magic (4) │Version(2)│  CRC32 (4)   │ │
//! │ └──────────┴──────────┴──────────────┘ │
//! ├────────────────────────────────────────┤
//! │ Payload                                │
//! │   bincode-encoded BTreeMap<key, value> │
//! └────────────────────────────────────────┘
//! ```

mod file;

pub use file::FileStore;

use crate::error::Result;

/// Durable mapping from string key to opaque value bytes.
///
/// The engine only ever mutates the store during a commit; the store never
/// interprets the value bytes it is handed.
pub trait PersistentMap {
    /// Get the value for a key, or `None` if absent
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Set a key to a value (overwrite semantics)
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key, returning whether it was present.
    /// Deleting an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Check whether a key is present
    fn contains(&self, key: &str) -> bool;

    /// Snapshot of all entries, for diagnostics and iteration
    fn entries(&self) -> Vec<(String, Vec<u8>)>;

    /// Release the store, syncing any state to disk
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
