// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The orchestrator talks to a `ProcessLauncher` instead of spawning
//! processes itself. Production uses [`ShellLauncher`](super::ShellLauncher);
//! tests provide a fake that records start/end order and can hold commands
//! open until released or aborted.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::abort::AbortToken;
use crate::errors::Result;
use crate::output::OutputSink;
use crate::types::KillSignal;

/// Everything needed to start one command.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Fully substituted command line.
    pub command: String,
    /// Shell program; the platform shell when `None`.
    pub shell: Option<String>,
    pub cwd: PathBuf,
    /// Cancelling this token must stop the process.
    pub abort: AbortToken,
    /// Signal to deliver when `abort` fires.
    pub kill_signal: KillSignal,
}

pub type LaunchFuture = Pin<Box<dyn Future<Output = Result<i32>> + Send + 'static>>;

/// Trait abstracting how commands are executed.
pub trait ProcessLauncher: Send + Sync {
    /// Run `request` to completion, streaming stdout/stderr chunks into
    /// `sink`.
    ///
    /// Resolves to the exit status. `Err` means the process could not be
    /// started at all.
    fn launch(&self, request: LaunchRequest, sink: Arc<dyn OutputSink>) -> LaunchFuture;
}
