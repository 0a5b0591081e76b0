// src/exec/shell.rs

//! Real process launcher built on `tokio::process`.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::abort::AbortToken;
use crate::errors::{Result, RunOnSaveError};
use crate::exec::backend::{LaunchFuture, LaunchRequest, ProcessLauncher};
use crate::exec::signal::{deliver, exit_code};
use crate::output::OutputSink;

const READ_CHUNK: usize = 8192;

/// How long to keep reading output once the shell has exited.
///
/// Background grandchildren (`server &`) inherit the pipes and can hold them
/// open indefinitely; the exit status does not wait for them.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Runs each command through a shell (`<shell> -c <cmd>`, or `cmd /C` on
/// Windows).
#[derive(Debug, Clone, Copy)]
pub struct ShellLauncher {
    drain_grace: Duration,
}

impl ShellLauncher {
    pub fn new() -> Self {
        Self::with_drain_grace(DEFAULT_DRAIN_GRACE)
    }

    pub fn with_drain_grace(drain_grace: Duration) -> Self {
        Self { drain_grace }
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, request: LaunchRequest, sink: Arc<dyn OutputSink>) -> LaunchFuture {
        Box::pin(run_shell_command(request, sink, self.drain_grace))
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(shell: Option<&str>, command_line: &str) -> Command {
    let default_shell = if cfg!(windows) { "cmd" } else { "sh" };
    let program = shell.unwrap_or(default_shell);
    let is_cmd_exe = cfg!(windows)
        && Path::new(program)
            .file_stem()
            .is_some_and(|stem| stem.eq_ignore_ascii_case("cmd"));
    let flag = if is_cmd_exe { "/C" } else { "-c" };

    let mut cmd = Command::new(program);
    cmd.arg(flag).arg(command_line);
    cmd
}

async fn run_shell_command(
    request: LaunchRequest,
    sink: Arc<dyn OutputSink>,
    drain_grace: Duration,
) -> Result<i32> {
    info!(
        cmd = %request.command,
        cwd = %request.cwd.display(),
        "starting command process"
    );

    let mut cmd = shell_command(request.shell.as_deref(), &request.command);
    cmd.current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| RunOnSaveError::Spawn {
        command: request.command.clone(),
        source,
    })?;

    let readers: Vec<_> = [
        child.stdout.take().map(|out| tokio::spawn(forward_chunks(out, Arc::clone(&sink)))),
        child.stderr.take().map(|err| tokio::spawn(forward_chunks(err, Arc::clone(&sink)))),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Either the process exits on its own, or the current generation is
    // aborted and we signal it, then wait for it to go away.
    let mut aborted = false;
    let status = tokio::select! {
        status = child.wait() => status?,
        _ = request.abort.cancelled() => {
            aborted = true;
            info!(
                cmd = %request.command,
                signal = %request.kill_signal,
                "abort requested; signalling command process"
            );
            if let Err(err) = deliver(&mut child, request.kill_signal) {
                warn!(
                    cmd = %request.command,
                    error = %err,
                    "failed to signal command process; killing it"
                );
                child.start_kill()?;
            }
            child.wait().await?
        }
    };

    // Drain remaining output so it lands before any "after" message. An
    // abort during the drain stops it; one before it does not.
    let watch_abort = (!aborted).then_some(&request.abort);
    drain_output(readers, drain_grace, watch_abort).await;

    let code = exit_code(status);
    info!(
        cmd = %request.command,
        exit_code = code,
        success = status.success(),
        "command process exited"
    );
    Ok(code)
}

/// Wait for the output forwarders, for at most `grace` or until `abort`
/// fires. Forwarders still running after that are cancelled.
async fn drain_output(
    mut readers: Vec<JoinHandle<()>>,
    grace: Duration,
    abort: Option<&AbortToken>,
) {
    let joined = async {
        for reader in readers.iter_mut() {
            if let Err(err) = reader.await {
                debug!(error = %err, "output forwarder ended abnormally");
            }
        }
    };
    let interrupted = async {
        match abort {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    let drained = tokio::select! {
        res = tokio::time::timeout(grace, joined) => res.is_ok(),
        _ = interrupted => false,
    };

    if !drained {
        debug!("output pipes still open after exit; detaching forwarders");
        for reader in &readers {
            reader.abort();
        }
    }
}

async fn forward_chunks<R>(mut reader: R, sink: Arc<dyn OutputSink>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.append(&String::from_utf8_lossy(&buf[..n])),
            Err(err) => {
                debug!(error = %err, "stopped reading command output");
                break;
            }
        }
    }
}
