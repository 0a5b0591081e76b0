// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Which kind of document produced a save event.
///
/// Both kinds flow through the same pipeline; the kind is only kept for
/// logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    TextDocument,
    Notebook,
}

/// A saved resource as seen by the tracker and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    kind: ResourceKind,
    path: PathBuf,
    is_dirty: bool,
}

impl Resource {
    pub fn text_document(path: impl Into<PathBuf>, is_dirty: bool) -> Self {
        Self {
            kind: ResourceKind::TextDocument,
            path: path.into(),
            is_dirty,
        }
    }

    pub fn notebook(path: impl Into<PathBuf>, is_dirty: bool) -> Self {
        Self {
            kind: ResourceKind::Notebook,
            path: path.into(),
            is_dirty,
        }
    }

    /// Build a resource for `path`, picking the kind from its extension.
    pub fn for_path(path: impl Into<PathBuf>, is_dirty: bool) -> Self {
        let path = path.into();
        let is_notebook = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"));
        if is_notebook {
            Self::notebook(path, is_dirty)
        } else {
            Self::text_document(path, is_dirty)
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

/// When the output sink should be revealed for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPanelPolicy {
    Always,
    Error,
    #[default]
    Never,
}

/// Signal delivered to a running command when work is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum KillSignal {
    #[default]
    Term,
    Int,
    Kill,
}

impl KillSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            KillSignal::Term => "SIGTERM",
            KillSignal::Int => "SIGINT",
            KillSignal::Kill => "SIGKILL",
        }
    }

    /// Conventional signal number, used to synthesise `128 + signo` exit codes.
    pub fn number(&self) -> i32 {
        match self {
            KillSignal::Term => 15,
            KillSignal::Int => 2,
            KillSignal::Kill => 9,
        }
    }
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KillSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("SIG").unwrap_or(&upper) {
            "TERM" => Ok(KillSignal::Term),
            "INT" => Ok(KillSignal::Int),
            "KILL" => Ok(KillSignal::Kill),
            _ => Err(format!(
                "invalid kill_signal: {s} (expected \"SIGTERM\", \"SIGINT\" or \"SIGKILL\")"
            )),
        }
    }
}

impl TryFrom<String> for KillSignal {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
