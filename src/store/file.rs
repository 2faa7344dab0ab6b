//! File-backed store
//!
//! Keeps the full map in memory and rewrites a checksummed snapshot file on
//! every mutation. The snapshot is written to a temp file and renamed into
//! place, so a torn write never clobbers the previous snapshot.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StageError};

use super::PersistentMap;

/// Snapshot file magic bytes
const MAGIC: &[u8; 4] = b"SKV1";

/// Snapshot format version
const FORMAT_VERSION: u16 = 1;

/// Header size: 4 bytes magic + 2 bytes version + 4 bytes CRC32
const HEADER_SIZE: usize = 10;

/// Durable key-value map backed by a single snapshot file
pub struct FileStore {
    /// Snapshot file path
    path: PathBuf,

    /// In-memory view of the persisted map
    data: BTreeMap<String, Vec<u8>>,
}

impl FileStore {
    /// Open or create a store at the given file path
    ///
    /// A missing file yields an empty store. A present file is validated
    /// (magic, version, CRC32) before its map is loaded.
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            Self::load(path)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Number of persisted entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Load and validate a snapshot file
    fn load(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
        let bytes = fs::read(path)?;

        // A zero-length file is treated as an empty store
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }

        if bytes.len() < HEADER_SIZE {
            return Err(StageError::StoreCorruption(format!(
                "snapshot too short: {} bytes (header is {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(StageError::StoreCorruption(
                "bad magic bytes in snapshot header".to_string(),
            ));
        }

        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(StageError::StoreCorruption(format!(
                "unsupported snapshot version: {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let expected_crc = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload = &bytes[HEADER_SIZE..];
        let actual_crc = crc32fast::hash(payload);

        if actual_crc != expected_crc {
            return Err(StageError::StoreCorruption(format!(
                "CRC mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        bincode::deserialize(payload)
            .map_err(|e| StageError::StoreCorruption(format!("snapshot decode failed: {}", e)))
    }

    /// Write the current map as a new snapshot (temp file + atomic rename)
    fn persist(&self) -> Result<()> {
        let payload = bincode::serialize(&self.data)
            .map_err(|e| StageError::Serialization(format!("snapshot encode failed: {}", e)))?;
        let crc = crc32fast::hash(&payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&crc.to_be_bytes());
        buf.extend_from_slice(&payload);

        let tmp_path = self.path.with_extension("db.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

impl PersistentMap for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.data.insert(key.to_string(), value.to_vec());
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let was_present = self.data.remove(key).is_some();

        // No snapshot rewrite needed when nothing changed
        if was_present {
            self.persist()?;
        }

        Ok(was_present)
    }

    fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn entries(&self) -> Vec<(String, Vec<u8>)> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn close(self) -> Result<()> {
        self.persist()
    }
}
