// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::watch::hash::compute_file_hash;

/// What a filesystem event meant for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Content differs from the last time we saw it (or first sighting).
    Changed,
    /// Written, but the content hash is unchanged.
    Unchanged,
    /// Not a regular file any more.
    Missing,
}

/// In-memory cache of the last seen content hash per file.
///
/// This is what turns raw write events into "dirty" or "unchanged" saves.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Re-hash `path` and compare with the cached hash.
    pub fn observe(&mut self, path: &Path) -> Result<Observation> {
        let Some(hash) = compute_file_hash(path)? else {
            if self.hashes.remove(path).is_some() {
                debug!("forgot hash for vanished file {:?}", path);
            }
            return Ok(Observation::Missing);
        };

        let observation = match self.hashes.get(path) {
            Some(previous) if *previous == hash => Observation::Unchanged,
            _ => Observation::Changed,
        };
        self.hashes.insert(path.to_path_buf(), hash);
        Ok(observation)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
