// src/engine/runtime.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::load_and_validate;
use crate::engine::orchestrator::Orchestrator;
use crate::errors::Result;
use crate::tracker::SaveTracker;
use crate::types::Resource;

pub const RELOAD_MESSAGE: &str = "Run On Save: Reloading config.";

/// Events sent into the runtime from the watcher, the stdin control reader
/// and the Ctrl-C handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    WillSave(Resource),
    DidSave(Resource),
    /// The configuration file changed on disk.
    ConfigChanged,
    Enable,
    Disable,
    ShowOutput,
    ReportStatus,
    ShutdownRequested,
}

/// Host-side event loop.
///
/// Owns the save tracker and forwards everything else to the orchestrator.
/// Ends on `ShutdownRequested` or when every sender is gone, and disposes
/// the orchestrator on the way out.
pub struct Runtime {
    orchestrator: Orchestrator,
    tracker: Arc<SaveTracker>,
    config_path: PathBuf,
    events_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(
        orchestrator: Orchestrator,
        config_path: PathBuf,
        events_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Self {
        let tracker = Arc::new(save_tracker_for(&orchestrator));
        Self {
            orchestrator,
            tracker,
            config_path,
            events_rx,
        }
    }

    pub fn tracker(&self) -> Arc<SaveTracker> {
        Arc::clone(&self.tracker)
    }

    pub async fn run(mut self) -> Result<()> {
        info!("runonsave runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::WillSave(resource) => self.tracker.on_will_save(&resource),
                RuntimeEvent::DidSave(resource) => {
                    if !self.tracker.on_did_save(&resource) {
                        debug!(path = %resource.path().display(), "save suppressed");
                    }
                }
                RuntimeEvent::ConfigChanged => self.reload_config(),
                RuntimeEvent::Enable => self.orchestrator.enable(),
                RuntimeEvent::Disable => self.orchestrator.disable(),
                RuntimeEvent::ShowOutput => self.orchestrator.show_output(),
                RuntimeEvent::ReportStatus => {
                    let snapshot = self.orchestrator.status();
                    self.orchestrator.message(&snapshot.to_string());
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    break;
                }
            }
        }

        self.orchestrator.shutdown().await;
        info!("runonsave runtime exiting");
        Ok(())
    }

    /// Re-read the config file. On failure the previous config stays active.
    fn reload_config(&self) {
        self.orchestrator.message(RELOAD_MESSAGE);

        match load_and_validate(&self.config_path) {
            Ok(config) => self.orchestrator.reload_config(config),
            Err(err) => {
                warn!(
                    path = %self.config_path.display(),
                    error = %err,
                    "config reload failed; keeping previous config"
                );
                self.orchestrator.message(&err.to_string());
            }
        }
    }
}

/// Tracker wired to `orchestrator`: non-suppressed saves start a batch, and
/// `ignore_unchanged_files` is read from the live config.
pub fn save_tracker_for(orchestrator: &Orchestrator) -> SaveTracker {
    let runner = orchestrator.clone();
    let settings = orchestrator.clone();
    SaveTracker::new(
        move |resource: &Resource| {
            // Dropping the handle detaches the batch waiter; it still
            // prints the batch summary when every job settles.
            drop(runner.run_commands(resource));
        },
        move || settings.config().settings().ignore_unchanged_files,
    )
}
