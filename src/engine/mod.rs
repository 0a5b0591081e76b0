// src/engine/mod.rs

//! Orchestration engine for runonsave.
//!
//! This module ties together:
//! - the pure scheduler state (queue, counters, enabled flag)
//! - the async orchestrator that runs sequential and parallel commands
//! - abort tokens used to stop running processes
//! - the status model shown to the user
//! - the runtime event loop that reacts to:
//!   - will-save / did-save events from the watcher or stdin
//!   - config file changes
//!   - enable / disable / status requests
//!   - shutdown signals

pub mod abort;
pub mod control;
pub mod core;
pub mod job;
pub mod orchestrator;
pub mod runtime;
pub mod status;

pub use abort::AbortToken;
pub use control::{ControlCommand, parse_control_line, read_control_lines};
pub use job::{ExecResult, JobOutcome, ResolvedCommand};
pub use orchestrator::{BatchHandle, BatchReport, Orchestrator, OrchestratorDeps};
pub use runtime::{Runtime, RuntimeEvent, save_tracker_for};
pub use status::{OrchestratorStatus, StatusSnapshot, StatusSurface, TracingStatusSurface};
