// src/output.rs

//! Output sink abstraction.
//!
//! Command output and status messages are appended here. Writers may be
//! concurrent (parallel jobs), so chunks from different commands can
//! interleave.

use std::io::{IsTerminal, Write};

use tracing::{debug, warn};

pub trait OutputSink: Send + Sync {
    /// Append raw text (a stdout/stderr chunk).
    fn append(&self, text: &str);

    /// Append a line of text.
    fn append_line(&self, line: &str) {
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push('\n');
        self.append(&text);
    }

    fn clear(&self);

    /// Bring the sink to the user's attention.
    fn show(&self, force_focus: bool);
}

/// Writes everything to the process stdout.
///
/// Logs go to stderr (see `logging`), so stdout carries only command output
/// and messages.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for ConsoleSink {
    fn append(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            warn!(error = %err, "failed to write to stdout");
        }
    }

    fn clear(&self) {
        let stdout = std::io::stdout();
        if stdout.is_terminal() {
            // ANSI: clear screen, cursor home.
            self.append("\x1b[2J\x1b[H");
        } else {
            debug!("clear requested on non-terminal stdout; ignoring");
        }
    }

    fn show(&self, force_focus: bool) {
        // The console is always visible.
        debug!(force_focus, "show output requested");
    }
}
