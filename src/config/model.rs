// src/config/model.rs

use serde::Deserialize;

use crate::matcher::RuleMatcher;
use crate::types::{KillSignal, OutputPanelPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// shell = "/bin/bash"
/// auto_clear_console = true
/// message = "saving..."
///
/// [[commands]]
/// match = "\\.rs$"
/// cmd = "rustfmt ${file}"
/// ```
///
/// All sections are optional. A file with no `[[commands]]` is valid and
/// simply never runs anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Ordered command rules from `[[commands]]`.
    ///
    /// Order matters: it is the execution order for one save.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Shell used to run commands; the platform shell when absent.
    #[serde(default)]
    pub shell: Option<String>,

    /// Clear the output sink before each batch.
    #[serde(default)]
    pub auto_clear_console: bool,

    /// Skip saves that were not preceded by a dirty will-save.
    #[serde(default)]
    pub ignore_unchanged_files: bool,

    /// Printed when a batch starts.
    #[serde(default)]
    pub message: Option<String>,

    /// Printed once every command of a batch has finished.
    #[serde(default)]
    pub message_after: Option<String>,

    /// Print the total elapsed time of a batch.
    #[serde(default)]
    pub show_elapsed: bool,
}

/// One `[[commands]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandConfig {
    /// Regex a path must match; empty or absent matches everything.
    #[serde(default, rename = "match")]
    pub match_pattern: Option<String>,

    /// Regex that excludes a path even when `match` succeeds.
    #[serde(default)]
    pub not_match: Option<String>,

    /// Command template. Absent means a message-only step.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub message_after: Option<String>,

    /// Launch without waiting for the sequential lane.
    #[serde(default, alias = "is_parallel")]
    pub is_async: bool,

    #[serde(default)]
    pub show_elapsed: bool,

    #[serde(default)]
    pub auto_show_output_panel: OutputPanelPolicy,

    #[serde(default)]
    pub kill_signal: KillSignal,
}

/// A command entry together with its compiled path matcher.
#[derive(Debug, Clone)]
pub struct CommandRule {
    config: CommandConfig,
    matcher: RuleMatcher,
}

impl CommandRule {
    pub(crate) fn new(config: CommandConfig, matcher: RuleMatcher) -> Self {
        Self { config, matcher }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so every `match` / `not_match` regex is known to compile.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    config: ConfigSection,
    commands: Vec<CommandRule>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, commands: Vec<CommandRule>) -> Self {
        Self { config, commands }
    }

    pub fn settings(&self) -> &ConfigSection {
        &self.config
    }

    pub fn commands(&self) -> &[CommandRule] {
        &self.commands
    }
}
