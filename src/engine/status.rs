// src/engine/status.rs

//! Derived orchestrator status and the surface it is reported to.

use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use tracing::{debug, info};

/// Status derived from the enabled flag and the current activity.
///
/// Never stored; recomputed from counters whenever it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorStatus {
    /// Disabled, nothing in flight.
    Disabled,
    /// Enabled, nothing in flight.
    Idle,
    /// Enabled, commands queued or running.
    Running,
    /// Disabled, but commands launched earlier are still winding down.
    Draining,
}

impl OrchestratorStatus {
    pub fn derive(enabled: bool, activity: usize) -> Self {
        match (enabled, activity) {
            (false, 0) => OrchestratorStatus::Disabled,
            (false, _) => OrchestratorStatus::Draining,
            (true, 0) => OrchestratorStatus::Idle,
            (true, _) => OrchestratorStatus::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorStatus::Disabled => "Disabled",
            OrchestratorStatus::Idle => "Idle",
            OrchestratorStatus::Running => "Running",
            OrchestratorStatus::Draining => "Draining",
        }
    }
}

impl fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the orchestrator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: OrchestratorStatus,
    pub queued: usize,
    pub sequential: usize,
    pub parallel: usize,
}

impl StatusSnapshot {
    pub fn activity(&self) -> usize {
        self.queued + self.sequential + self.parallel
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run On Save: {}", self.status)?;
        if self.activity() > 0 {
            write!(
                f,
                " (queued {}, sequential {}, parallel {})",
                self.queued, self.sequential, self.parallel
            )?;
        }
        Ok(())
    }
}

/// Display surface for status updates (a status bar in an editor host).
pub trait StatusSurface: Send + Sync {
    /// Called after every state-affecting operation.
    fn update(&self, snapshot: &StatusSnapshot);
}

/// Logs status changes through `tracing`.
///
/// Repeated identical snapshots are only logged at debug level.
#[derive(Debug, Default)]
pub struct TracingStatusSurface {
    last: Mutex<Option<StatusSnapshot>>,
}

impl StatusSurface for TracingStatusSurface {
    fn update(&self, snapshot: &StatusSnapshot) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(snapshot) {
            debug!(%snapshot, "status unchanged");
            return;
        }
        info!(
            status = %snapshot.status,
            queued = snapshot.queued,
            sequential = snapshot.sequential,
            parallel = snapshot.parallel,
            "status"
        );
        *last = Some(*snapshot);
    }
}
