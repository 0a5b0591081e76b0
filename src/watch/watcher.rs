// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::types::Resource;
use crate::watch::cache::{FileCache, Observation};
use crate::watch::path_utils::{canonical_or_self, is_ignored, same_path};

/// Events arriving closer together than this are handled as one burst, so
/// an editor's write-rename-chmod sequence becomes a single save.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(100);

/// Predicate telling the watcher that a path was just handled by a batch, so
/// writes to it come from the commands themselves rather than the user.
pub type RecentRunFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch every workspace root recursively and turn file writes into
/// will-save / did-save pairs on `runtime_tx`.
///
/// Writes to `config_path` become `RuntimeEvent::ConfigChanged` instead.
/// If the config file lives outside every root, its directory is watched
/// non-recursively as well. Writes to a path for which `recently_ran` holds
/// are dropped, so a command rewriting the file it was run for does not
/// trigger itself.
pub fn spawn_watcher(
    roots: &[PathBuf],
    config_path: &Path,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    recently_ran: RecentRunFilter,
) -> Result<WatcherHandle> {
    let roots: Vec<PathBuf> = roots.iter().map(|r| canonical_or_self(r)).collect();
    let config_path = canonical_or_self(config_path);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("runonsave: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("runonsave: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for root in &roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watching workspace folder {:?}", root))?;
        info!("file watcher started on {:?}", root);
    }

    let config_covered = roots.iter().any(|root| config_path.starts_with(root));
    if !config_covered {
        if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching config directory {:?}", dir))?;
            debug!("watching config directory {:?}", dir);
        }
    }

    tokio::spawn(forward_events(event_rx, config_path, runtime_tx, recently_ran));

    Ok(WatcherHandle { _inner: watcher })
}

async fn forward_events(
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    config_path: PathBuf,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    recently_ran: RecentRunFilter,
) {
    let cache = Arc::new(Mutex::new(FileCache::new()));

    while let Some(first) = event_rx.recv().await {
        let mut paths = BTreeSet::new();
        collect_paths(&first, &mut paths);

        while let Ok(Some(event)) = tokio::time::timeout(COALESCE_WINDOW, event_rx.recv()).await {
            collect_paths(&event, &mut paths);
        }

        if paths.is_empty() {
            continue;
        }
        debug!(count = paths.len(), "processing coalesced file events");

        // Hashing reads files; keep it off the async workers.
        let batch_cache = Arc::clone(&cache);
        let batch_config = config_path.clone();
        let batch_filter = Arc::clone(&recently_ran);
        let events = tokio::task::spawn_blocking(move || {
            let mut cache = batch_cache.lock().unwrap_or_else(PoisonError::into_inner);
            events_for_paths(paths, &batch_config, &mut cache, &*batch_filter)
        })
        .await;

        let events = match events {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "file event processing failed");
                continue;
            }
        };

        for event in events {
            if let Err(err) = runtime_tx.send(event).await {
                warn!("failed to send runtime event: {err}");
                // If the runtime channel is closed, there's no point
                // keeping the watcher loop alive.
                return;
            }
        }
    }

    debug!("file watcher loop ended");
}

fn collect_paths(event: &Event, paths: &mut BTreeSet<PathBuf>) {
    // Metadata-only changes (`touch`, chmod) are not saves.
    let relevant = match event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) => true,
        _ => false,
    };
    if !relevant {
        return;
    }
    paths.extend(event.paths.iter().filter(|p| !is_ignored(p)).cloned());
}

/// Translate a burst of changed paths into runtime events.
///
/// At most one `ConfigChanged` is emitted per burst, after the saves. Paths
/// for which `recently_ran` holds still refresh the cache but emit nothing.
pub(crate) fn events_for_paths(
    paths: BTreeSet<PathBuf>,
    config_path: &Path,
    cache: &mut FileCache,
    recently_ran: &dyn Fn(&Path) -> bool,
) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    let mut config_changed = false;

    for path in paths {
        if same_path(&path, config_path) {
            config_changed = true;
            continue;
        }

        let is_dirty = match cache.observe(&path) {
            Ok(Observation::Changed) => true,
            Ok(Observation::Unchanged) => false,
            Ok(Observation::Missing) => continue,
            Err(err) => {
                warn!(error = %err, "could not hash {:?}; treating as modified", path);
                true
            }
        };

        if recently_ran(&path) {
            debug!(?path, "write by a command for this file; not a save");
            continue;
        }

        debug!(?path, is_dirty, "file saved");
        let resource = Resource::for_path(path, is_dirty);
        events.push(RuntimeEvent::WillSave(resource.clone()));
        events.push(RuntimeEvent::DidSave(resource));
    }

    if config_changed {
        events.push(RuntimeEvent::ConfigChanged);
    }
    events
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn never(_: &Path) -> bool {
        false
    }

    #[test]
    fn writes_become_save_pairs_with_dirtiness_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        let config = dir.path().join("RunOnSave.toml");
        fs::write(&file, "a").unwrap();

        let mut cache = FileCache::new();
        let burst = || BTreeSet::from([file.clone()]);

        let first = events_for_paths(burst(), &config, &mut cache, &never);
        assert_eq!(
            first,
            vec![
                RuntimeEvent::WillSave(Resource::text_document(&file, true)),
                RuntimeEvent::DidSave(Resource::text_document(&file, true)),
            ]
        );

        let again = events_for_paths(burst(), &config, &mut cache, &never);
        assert_eq!(
            again,
            vec![
                RuntimeEvent::WillSave(Resource::text_document(&file, false)),
                RuntimeEvent::DidSave(Resource::text_document(&file, false)),
            ]
        );
    }

    #[test]
    fn config_file_triggers_one_reload_and_no_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("RunOnSave.toml");
        let other = dir.path().join("notes.ipynb");
        fs::write(&config, "").unwrap();
        fs::write(&other, "{}").unwrap();

        let mut cache = FileCache::new();
        let events = events_for_paths(
            BTreeSet::from([config.clone(), other.clone()]),
            &config,
            &mut cache,
            &never,
        );

        assert_eq!(
            events,
            vec![
                RuntimeEvent::WillSave(Resource::notebook(&other, true)),
                RuntimeEvent::DidSave(Resource::notebook(&other, true)),
                RuntimeEvent::ConfigChanged,
            ]
        );
    }

    #[test]
    fn vanished_files_and_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FileCache::new();
        let events = events_for_paths(
            BTreeSet::from([dir.path().to_path_buf(), dir.path().join("deleted.rs")]),
            &dir.path().join("RunOnSave.toml"),
            &mut cache,
            &never,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn command_writes_to_a_recently_run_file_are_not_saves() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fmt.rs");
        let config = dir.path().join("RunOnSave.toml");
        fs::write(&file, "before").unwrap();

        let mut cache = FileCache::new();
        let burst = || BTreeSet::from([file.clone()]);
        events_for_paths(burst(), &config, &mut cache, &never);

        // The formatter run for this save rewrites the file.
        fs::write(&file, "after").unwrap();
        let busy = |p: &Path| p == file.as_path();
        assert!(events_for_paths(burst(), &config, &mut cache, &busy).is_empty());

        // The rewrite was still recorded, so re-saving it is not a change.
        let later = events_for_paths(burst(), &config, &mut cache, &never);
        assert_eq!(
            later,
            vec![
                RuntimeEvent::WillSave(Resource::text_document(&file, false)),
                RuntimeEvent::DidSave(Resource::text_document(&file, false)),
            ]
        );
    }

    #[test]
    fn metadata_only_changes_are_not_collected() {
        use notify::event::{MetadataKind, ModifyKind};

        let mut paths = BTreeSet::new();
        let touch = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
            .add_path(PathBuf::from("/w/a.rs"));
        collect_paths(&touch, &mut paths);
        assert!(paths.is_empty());

        let write = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/w/a.rs"));
        collect_paths(&write, &mut paths);
        assert_eq!(paths, BTreeSet::from([PathBuf::from("/w/a.rs")]));
    }
}
