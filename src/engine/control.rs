// src/engine/control.rs

//! Line-based control channel on stdin.
//!
//! One command per line:
//!
//! ```text
//! enable | disable | status | show | save <path> | quit
//! ```

use std::path::PathBuf;

use anyhow::anyhow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::runtime::RuntimeEvent;
use crate::errors::{Result, RunOnSaveError};
use crate::types::Resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Enable,
    Disable,
    Status,
    Show,
    /// Simulate an editor save of a modified buffer.
    Save(PathBuf),
    Quit,
}

impl ControlCommand {
    /// Runtime events equivalent to this command.
    pub fn into_events(self) -> Vec<RuntimeEvent> {
        match self {
            ControlCommand::Enable => vec![RuntimeEvent::Enable],
            ControlCommand::Disable => vec![RuntimeEvent::Disable],
            ControlCommand::Status => vec![RuntimeEvent::ReportStatus],
            ControlCommand::Show => vec![RuntimeEvent::ShowOutput],
            ControlCommand::Save(path) => {
                let resource = Resource::for_path(path, true);
                vec![
                    RuntimeEvent::WillSave(resource.clone()),
                    RuntimeEvent::DidSave(resource),
                ]
            }
            ControlCommand::Quit => vec![RuntimeEvent::ShutdownRequested],
        }
    }
}

/// Parse one control line. Blank lines and `#` comments yield `None`.
pub fn parse_control_line(line: &str) -> Result<Option<ControlCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("enable", "") => ControlCommand::Enable,
        ("disable", "") => ControlCommand::Disable,
        ("status", "") => ControlCommand::Status,
        ("show", "") => ControlCommand::Show,
        ("quit" | "exit", "") => ControlCommand::Quit,
        ("save", "") => {
            return Err(RunOnSaveError::Other(anyhow!("`save` needs a file path")));
        }
        ("save", path) => ControlCommand::Save(PathBuf::from(path)),
        (other, _) => {
            return Err(RunOnSaveError::Other(anyhow!(
                "unknown control command `{other}` (expected enable, disable, status, show, save <path>, quit)"
            )));
        }
    };

    Ok(Some(command))
}

/// Read control lines until EOF or `quit`, forwarding events to the runtime.
///
/// EOF only stops reading; the runtime keeps going.
pub async fn read_control_lines<R>(reader: R, tx: mpsc::Sender<RuntimeEvent>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_control_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = %line, error = %err, "ignoring control line");
                continue;
            }
        };

        debug!(?command, "control command");
        let quit = command == ControlCommand::Quit;
        for event in command.into_events() {
            if tx.send(event).await.is_err() {
                debug!("runtime gone; control reader stopping");
                return Ok(());
            }
        }
        if quit {
            break;
        }
    }

    info!("control input closed");
    Ok(())
}
