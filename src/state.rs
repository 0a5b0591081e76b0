// src/state.rs

//! Persistent boolean flags (currently just the enabled switch).
//!
//! Two stores, mirroring each other:
//! - [`FileFlagStore`] keeps `key value` lines in `<root>/.runonsave/state`
//!   so the flag survives restarts.
//! - [`MemoryFlagStore`] keeps them in memory only.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::errors::{Result, RunOnSaveError};

/// Key of the enabled/disabled flag.
pub const ENABLED_KEY: &str = "isEnabled";

/// Relative path (from the workspace root) to the state file.
pub const STATE_FILE_PATH: &str = ".runonsave/state";

pub trait FlagStore: Send + Sync {
    /// Read `key`, falling back to `default` when unset or unreadable.
    fn get(&self, key: &str, default: bool) -> bool;
    fn update(&mut self, key: &str, value: bool) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    map: BTreeMap<String, bool>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str, default: bool) -> bool {
        self.map.get(key).copied().unwrap_or(default)
    }

    fn update(&mut self, key: &str, value: bool) -> Result<()> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileFlagStore {
    root: PathBuf,
}

impl FileFlagStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(STATE_FILE_PATH)
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str, default: bool) -> bool {
        match load_all_flags(&self.path()) {
            Ok(map) => map.get(key).copied().unwrap_or(default),
            Err(err) => {
                warn!(key, error = %err, "failed to read state file; using default");
                default
            }
        }
    }

    fn update(&mut self, key: &str, value: bool) -> Result<()> {
        let path = self.path();
        let mut map = load_all_flags(&path)?;
        map.insert(key.to_string(), value);
        save_all_flags(&path, &map)?;
        info!(key, value, "stored flag");
        Ok(())
    }
}

fn load_all_flags(path: &Path) -> Result<BTreeMap<String, bool>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let file = File::open(path).with_context(|| format!("opening state file at {path:?}"))?;
    let mut map = BTreeMap::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(char::is_whitespace) else {
            return Err(RunOnSaveError::StateError(format!(
                "malformed line in {path:?}: {trimmed:?}"
            )));
        };
        let value = value.trim().parse::<bool>().map_err(|_| {
            RunOnSaveError::StateError(format!("non-boolean value for {key:?} in {path:?}"))
        })?;
        map.insert(key.to_string(), value);
    }

    Ok(map)
}

fn save_all_flags(path: &Path, map: &BTreeMap<String, bool>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory at {parent:?}"))?;
    }

    let file = File::create(path).with_context(|| format!("creating state file at {path:?}"))?;
    let mut writer = BufWriter::new(file);
    for (key, value) in map {
        writeln!(writer, "{key} {value}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_then_remembers() {
        let mut store = MemoryFlagStore::new();
        assert!(store.get(ENABLED_KEY, true));
        store.update(ENABLED_KEY, false).unwrap();
        assert!(!store.get(ENABLED_KEY, true));
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileFlagStore::new(dir.path());
            store.update(ENABLED_KEY, false).unwrap();
        }
        let store = FileFlagStore::new(dir.path());
        assert!(!store.get(ENABLED_KEY, true));
        assert!(dir.path().join(STATE_FILE_PATH).is_file());
    }

    #[test]
    fn corrupt_state_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFlagStore::new(dir.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "isEnabled maybe\n").unwrap();
        assert!(store.get(ENABLED_KEY, true));
    }
}
