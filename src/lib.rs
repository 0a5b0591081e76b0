// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod state;
pub mod substitute;
pub mod tracker;
pub mod types;
pub mod watch;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::{
    Orchestrator, OrchestratorDeps, Runtime, RuntimeEvent, TracingStatusSurface,
    read_control_lines,
};
use crate::exec::ShellLauncher;
use crate::matcher::matching_commands;
use crate::output::ConsoleSink;
use crate::state::{FileFlagStore, FlagStore, MemoryFlagStore};
use crate::types::Resource;
use crate::watch::path_utils::canonical_or_self;
use crate::workspace::WorkspaceFolders;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - orchestrator (shell launcher, console sink, flag store)
/// - either a one-shot run over `--once` files, or watch mode:
///   file watcher, stdin control reader, Ctrl-C handling, runtime loop
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    let workspace = workspace_folders(&args.workspaces)?;

    if args.dry_run {
        print_dry_run(&cfg, &workspace, &args.once)?;
        return Ok(());
    }

    let flags: Box<dyn FlagStore> = match workspace.primary_root() {
        Some(root) if !args.memory_state => Box::new(FileFlagStore::new(root)),
        _ => Box::new(MemoryFlagStore::new()),
    };

    let orchestrator = Orchestrator::start(
        cfg,
        OrchestratorDeps {
            launcher: Arc::new(ShellLauncher::new()),
            sink: Arc::new(ConsoleSink::new()),
            status: Arc::new(TracingStatusSurface::default()),
            flags,
            workspace: workspace.clone(),
        },
    );

    if !args.once.is_empty() {
        return run_once(&orchestrator, &args.once).await;
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let recently_ran = {
        let orchestrator = orchestrator.clone();
        Arc::new(move |path: &Path| orchestrator.ran_recently(path))
    };
    let _watcher_handle =
        crate::watch::spawn_watcher(workspace.roots(), &config_path, rt_tx.clone(), recently_ran)?;

    // Control lines on stdin.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(err) = read_control_lines(stdin, tx).await {
                warn!(error = %err, "stopped reading control input");
            }
        });
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    orchestrator.show_status_message();
    info!(roots = ?workspace.roots(), "watching for saves");

    let runtime = Runtime::new(orchestrator, canonical_or_self(&config_path), rt_rx);
    runtime.run().await?;
    Ok(())
}

/// Run the pipeline once for every file as a dirty save, wait for all work
/// to settle, then shut down. Fails if any command failed.
async fn run_once(orchestrator: &Orchestrator, files: &[PathBuf]) -> Result<()> {
    let mut batches = Vec::new();
    for file in files {
        let path = resolve_file(file)?;
        let resource = Resource::for_path(path, true);
        if let Some(batch) = orchestrator.run_commands(&resource) {
            batches.push(batch);
        }
    }

    let mut failed = 0;
    for batch in batches {
        failed += batch.wait().await.failed;
    }
    orchestrator.wait_idle().await;
    orchestrator.shutdown().await;

    if failed > 0 {
        bail!("{failed} command(s) failed");
    }
    Ok(())
}

/// Workspace folders from `--workspace`, or the current directory.
fn workspace_folders(dirs: &[PathBuf]) -> Result<WorkspaceFolders> {
    let dirs = if dirs.is_empty() {
        vec![std::env::current_dir().context("reading current directory")?]
    } else {
        dirs.to_vec()
    };

    let roots = dirs
        .iter()
        .map(|dir| absolute_path(dir).map(|abs| canonical_or_self(&abs)))
        .collect::<Result<Vec<_>>>()?;
    debug!(?roots, "workspace folders");
    Ok(WorkspaceFolders::new(roots))
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolving path {:?}", path))
}

/// Absolute, canonical form of a file named on the command line, so it
/// compares against workspace roots resolved the same way.
fn resolve_file(path: &Path) -> Result<PathBuf> {
    Ok(canonical_or_self(&absolute_path(path)?))
}

/// Dry-run output: print settings, commands, and which commands each file
/// would trigger.
fn print_dry_run(cfg: &ConfigFile, workspace: &WorkspaceFolders, files: &[PathBuf]) -> Result<()> {
    let settings = cfg.settings();

    println!("runonsave dry-run");
    println!(
        "  config.shell = {}",
        settings.shell.as_deref().unwrap_or("<platform default>")
    );
    println!("  config.auto_clear_console = {}", settings.auto_clear_console);
    println!("  config.ignore_unchanged_files = {}", settings.ignore_unchanged_files);
    println!("  config.show_elapsed = {}", settings.show_elapsed);
    println!();

    println!("commands ({}):", cfg.commands().len());
    for (index, rule) in cfg.commands().iter().enumerate() {
        let command = rule.config();
        println!("  [{index}] {}", command.cmd.as_deref().unwrap_or("<message only>"));
        if let Some(ref pattern) = command.match_pattern {
            println!("      match: {pattern}");
        }
        if let Some(ref pattern) = command.not_match {
            println!("      not_match: {pattern}");
        }
        if command.is_async {
            println!("      is_async: true");
        }
        println!("      kill_signal: {}", command.kill_signal);
    }

    for file in files {
        let path = resolve_file(file)?;
        let path_str = path.to_string_lossy();
        let matched: Vec<usize> = matching_commands(cfg.commands(), &path_str)
            .into_iter()
            .filter_map(|rule| {
                cfg.commands()
                    .iter()
                    .position(|candidate| std::ptr::eq(candidate, rule))
            })
            .collect();
        println!();
        println!("{path_str}");
        println!("  folder: {}", workspace.resolve_root(&path).display());
        println!("  matches: {matched:?}");
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;

    use super::*;

    #[test]
    fn files_under_a_symlinked_workspace_resolve_to_its_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(real.join("src")).unwrap();
        fs::write(real.join("src/a.txt"), "a").unwrap();
        let link = dir.path().join("link");
        symlink(&real, &link).unwrap();

        let folders = workspace_folders(&[link.clone()]).unwrap();
        let file = resolve_file(&link.join("src/a.txt")).unwrap();

        let root = folders.resolve_root(&file);
        assert_eq!(root, folders.roots()[0]);
        assert_eq!(file.strip_prefix(&root).unwrap(), Path::new("src/a.txt"));
    }
}
