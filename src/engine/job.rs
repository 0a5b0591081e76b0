// src/engine/job.rs

//! Concrete commands and the jobs that carry them through the scheduler.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::config::model::CommandConfig;
use crate::substitute::Replacements;
use crate::types::{KillSignal, OutputPanelPolicy};

/// A command entry with its templates substituted for one saved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub cmd: Option<String>,
    pub message: Option<String>,
    pub message_after: Option<String>,
    pub is_parallel: bool,
    pub show_elapsed: bool,
    pub output_panel: OutputPanelPolicy,
    pub kill_signal: KillSignal,
}

impl ResolvedCommand {
    pub fn resolve(config: &CommandConfig, replacements: &Replacements) -> Self {
        Self {
            cmd: replacements.apply_opt(config.cmd.as_deref()),
            message: replacements.apply_opt(config.message.as_deref()),
            message_after: replacements.apply_opt(config.message_after.as_deref()),
            is_parallel: config.is_async,
            show_elapsed: config.show_elapsed,
            output_panel: config.auto_show_output_panel,
            kill_signal: config.kill_signal,
        }
    }

    /// The command line to spawn, if any. Empty templates count as none.
    pub fn command_line(&self) -> Option<&str> {
        self.cmd.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Short label for logs.
    pub fn label(&self) -> &str {
        self.command_line()
            .or(self.message.as_deref())
            .unwrap_or("<message-only>")
    }
}

/// Result of running one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub status_code: i32,
    pub elapsed: Duration,
}

impl ExecResult {
    /// Result of a step with nothing to spawn.
    pub fn immediate() -> Self {
        Self {
            status_code: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

/// How a job's completion signal was fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The command ran (or failed to spawn) and produced a status.
    Completed(ExecResult),
    /// The job was dropped from the queue by an abort before it started.
    Discarded,
}

/// Execution lane of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Sequential,
    Parallel,
}

/// A resolved command bound to its trigger and completion signal.
#[derive(Debug)]
pub struct QueuedJob {
    pub command: ResolvedCommand,
    /// Saved file that produced this job.
    pub resource: PathBuf,
    /// Working directory for the spawned process.
    pub cwd: PathBuf,
    pub lane: Lane,
    done: oneshot::Sender<JobOutcome>,
}

impl QueuedJob {
    pub fn new(
        command: ResolvedCommand,
        resource: PathBuf,
        cwd: PathBuf,
    ) -> (Self, oneshot::Receiver<JobOutcome>) {
        let (done, rx) = oneshot::channel();
        let lane = if command.is_parallel {
            Lane::Parallel
        } else {
            Lane::Sequential
        };
        (
            Self {
                command,
                resource,
                cwd,
                lane,
                done,
            },
            rx,
        )
    }

    /// Fulfil the completion signal. Consumes the job, so this happens once.
    pub fn complete(self, result: ExecResult) {
        // The batch waiter may be gone (caller dropped the handle); that is fine.
        let _ = self.done.send(JobOutcome::Completed(result));
    }

    pub fn discard(self) {
        let _ = self.done.send(JobOutcome::Discarded);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn resolve_substitutes_all_template_fields() {
        let cfg = CommandConfig {
            cmd: Some("fmt ${fileBasename}".to_string()),
            message: Some("start ${relativeFile}".to_string()),
            message_after: Some("done ${fileExtname}".to_string()),
            is_async: true,
            ..CommandConfig::default()
        };
        let r = Replacements::for_file(Path::new("/w/src/a.rs"), Path::new("/w"), Path::new("/"));
        let resolved = ResolvedCommand::resolve(&cfg, &r);

        assert_eq!(resolved.cmd.as_deref(), Some("fmt a.rs"));
        assert_eq!(resolved.message.as_deref(), Some("start src/a.rs"));
        assert_eq!(resolved.message_after.as_deref(), Some("done .rs"));
        assert!(resolved.is_parallel);
    }

    #[test]
    fn blank_command_is_message_only() {
        let cfg = CommandConfig {
            cmd: Some("   ".to_string()),
            ..CommandConfig::default()
        };
        let r = Replacements::for_file(Path::new("/w/a"), Path::new("/w"), Path::new("/"));
        assert_eq!(ResolvedCommand::resolve(&cfg, &r).command_line(), None);
    }

    #[tokio::test]
    async fn discard_still_resolves_the_signal() {
        let cmd = ResolvedCommand::resolve(
            &CommandConfig::default(),
            &Replacements::for_file(Path::new("/w/a"), Path::new("/w"), Path::new("/")),
        );
        let (job, rx) = QueuedJob::new(cmd, PathBuf::from("/w/a"), PathBuf::from("/w"));
        assert_eq!(job.lane, Lane::Sequential);
        job.discard();
        assert_eq!(rx.await.unwrap(), JobOutcome::Discarded);
    }
}
