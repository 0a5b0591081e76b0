// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `ProcessLauncher` trait the orchestrator uses.
//! - [`shell`] is the production launcher: `tokio::process` through a shell,
//!   with stdout/stderr forwarded chunk by chunk to the output sink.
//! - [`signal`] delivers the configured kill signal on abort.

pub mod backend;
pub mod shell;
pub mod signal;

pub use backend::{LaunchFuture, LaunchRequest, ProcessLauncher};
pub use shell::ShellLauncher;
