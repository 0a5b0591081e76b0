// src/exec/signal.rs

//! Delivering the configured kill signal to a child process.

use tokio::process::Child;

use crate::types::KillSignal;

/// Send `signal` to `child` without waiting for it to exit.
///
/// On unix, TERM and INT are delivered with `kill(2)`; KILL (and every
/// signal on other platforms) goes through `start_kill`.
pub fn deliver(child: &mut Child, signal: KillSignal) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let sig = match signal {
            KillSignal::Term => Some(Signal::SIGTERM),
            KillSignal::Int => Some(Signal::SIGINT),
            KillSignal::Kill => None,
        };

        if let Some(sig) = sig {
            // `id()` is `None` once the child has been reaped; nothing to do.
            let Some(pid) = child.id() else {
                return Ok(());
            };
            let pid = i32::try_from(pid)
                .map_err(|_| std::io::Error::other(format!("pid {pid} out of range")))?;
            return kill(Pid::from_raw(pid), sig).map_err(std::io::Error::from);
        }
    }

    #[cfg(not(unix))]
    let _ = signal;

    child.start_kill()
}

/// Exit code for a finished process.
///
/// A unix process ended by a signal reports `128 + signo`, like a shell.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    -1
}
