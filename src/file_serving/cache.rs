//! Content-hash cache keyed by absolute path.
//!
//! The validator is the SHA-1 of the file contents rather than mtime/size,
//! so identical content produces identical ETags across independently
//! running instances. The mtime stored next to the hash only decides when
//! the hash must be recomputed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// One cached validator. Replaced wholesale on invalidation, never
/// field-mutated, so readers always observe a self-consistent pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Modification time the hash was computed at. The entry is stale as
    /// soon as the file's current mtime differs.
    pub mtime: SystemTime,
    /// Lower-case 40-char hex SHA-1 of the file contents.
    pub content_hash: String,
}

/// Concurrent path -> `CacheEntry` map owned by the server instance.
///
/// Entries never expire by count or size; unbounded growth is accepted.
/// Concurrent writers for the same path may race, but the last insert
/// always leaves a fully-formed entry.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    /// Atomic whole-value replace of the entry for `path`.
    pub fn insert(&self, path: PathBuf, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path, entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
