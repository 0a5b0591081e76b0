// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `runonsave`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runonsave",
    version,
    about = "Run configured shell commands whenever a matching file is saved.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `RunOnSave.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "RunOnSave.toml")]
    pub config: String,

    /// Workspace folder. Repeat for multi-root workspaces.
    ///
    /// Default: the current working directory.
    #[arg(long = "workspace", value_name = "DIR")]
    pub workspaces: Vec<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNONSAVE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the commands (and which of the `--once`
    /// files they match), but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Treat each FILE as saved once, wait for all commands, then exit.
    #[arg(long, value_name = "FILE", num_args = 1..)]
    pub once: Vec<PathBuf>,

    /// Keep the enabled flag in memory instead of `.runonsave/state`.
    #[arg(long)]
    pub memory_state: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
