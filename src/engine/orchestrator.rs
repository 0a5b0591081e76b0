// src/engine/orchestrator.rs

//! Async command orchestrator.
//!
//! Wraps the pure [`CoreState`] with:
//! - a perpetual sequential runner task that drains the FIFO queue one job
//!   at a time, sleeping on a `Notify` while the queue is empty,
//! - one Tokio task per parallel job,
//! - one fire-and-forget task per batch that waits for every job of that
//!   batch and prints the batch summary,
//! - the enabled flag (persisted through a [`FlagStore`]) and global abort.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::engine::abort::AbortToken;
use crate::engine::core::CoreState;
use crate::engine::job::{ExecResult, JobOutcome, Lane, QueuedJob, ResolvedCommand};
use crate::engine::status::{StatusSnapshot, StatusSurface};
use crate::exec::{LaunchRequest, ProcessLauncher};
use crate::matcher::matching_commands;
use crate::output::OutputSink;
use crate::state::{ENABLED_KEY, FlagStore};
use crate::substitute::Replacements;
use crate::types::{OutputPanelPolicy, Resource};
use crate::workspace::WorkspaceFolders;

/// Status reported for a command whose process could not be started.
pub const SPAWN_FAILURE_STATUS: i32 = 1;

/// How long after its last batch settles a saved path still counts as
/// recently run. Covers the watcher's coalescing window plus event latency.
pub const SETTLE_WINDOW: Duration = Duration::from_millis(500);

/// External collaborators of the orchestrator.
pub struct OrchestratorDeps {
    pub launcher: Arc<dyn ProcessLauncher>,
    pub sink: Arc<dyn OutputSink>,
    pub status: Arc<dyn StatusSurface>,
    pub flags: Box<dyn FlagStore>,
    pub workspace: WorkspaceFolders,
}

/// Summary of one batch, available through [`BatchHandle::wait`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub discarded: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Jobs that actually produced a status.
    pub fn ran(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Handle to the background task that waits for one batch.
///
/// Dropping it does not cancel anything.
#[derive(Debug)]
pub struct BatchHandle {
    handle: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub async fn wait(self) -> BatchReport {
        match self.handle.await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "batch waiter task failed");
                BatchReport::default()
            }
        }
    }
}

/// Cheap to clone; all clones drive the same scheduler.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

struct Inner {
    core: Mutex<CoreState>,
    /// Wakes the sequential runner (enqueue or dispose).
    wake: Notify,
    /// Signalled whenever activity drops to zero.
    idle: Notify,
    config: RwLock<Arc<ConfigFile>>,
    flags: Mutex<Box<dyn FlagStore>>,
    launcher: Arc<dyn ProcessLauncher>,
    sink: Arc<dyn OutputSink>,
    status: Arc<dyn StatusSurface>,
    workspace: WorkspaceFolders,
    runner: Mutex<Option<JoinHandle<()>>>,
    /// Per saved path: batches in flight and when the last one settled.
    recent: Mutex<HashMap<PathBuf, PathActivity>>,
}

#[derive(Debug, Default)]
struct PathActivity {
    in_flight: usize,
    settled_at: Option<Instant>,
}

impl PathActivity {
    fn is_recent(&self) -> bool {
        self.in_flight > 0 || self.settled_at.is_some_and(|at| at.elapsed() < SETTLE_WINDOW)
    }
}

impl Orchestrator {
    /// Create the orchestrator and spawn its sequential runner.
    ///
    /// Must be called from within a Tokio runtime. The enabled flag is read
    /// from `deps.flags` (default: enabled).
    pub fn start(config: ConfigFile, deps: OrchestratorDeps) -> Self {
        let enabled = deps.flags.get(ENABLED_KEY, true);

        let inner = Arc::new(Inner {
            core: Mutex::new(CoreState::new(enabled)),
            wake: Notify::new(),
            idle: Notify::new(),
            config: RwLock::new(Arc::new(config)),
            flags: Mutex::new(deps.flags),
            launcher: deps.launcher,
            sink: deps.sink,
            status: deps.status,
            workspace: deps.workspace,
            runner: Mutex::new(None),
            recent: Mutex::new(HashMap::new()),
        });

        let handle = tokio::spawn(sequential_loop(Arc::clone(&inner)));
        *inner.runner.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        info!(enabled, "orchestrator started");
        inner.refresh_status();
        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock_core().is_enabled()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.lock_core().snapshot()
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<ConfigFile> {
        self.inner.config()
    }

    /// Replace the configuration wholesale. Batches already started keep
    /// the commands they resolved.
    pub fn reload_config(&self, config: ConfigFile) {
        let count = config.commands().len();
        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        info!(commands = count, "configuration reloaded");
    }

    /// Append a line to the output sink.
    pub fn message(&self, text: &str) {
        self.inner.message(text);
    }

    /// Print `Run On Save enabled.` / `Run On Save disabled.`.
    pub fn show_status_message(&self) {
        let state = if self.is_enabled() { "enabled" } else { "disabled" };
        self.inner.message(&format!("Run On Save {state}."));
    }

    /// Reveal the output sink (what activating the status surface does).
    pub fn show_output(&self) {
        self.inner.sink.show(true);
    }

    /// Run every matching command for a saved resource.
    ///
    /// Parallel commands start immediately; sequential ones join the global
    /// FIFO. Returns a handle to the batch waiter, or `None` when nothing was
    /// scheduled. Never blocks on command execution.
    pub fn run_commands(&self, resource: &Resource) -> Option<BatchHandle> {
        let config = self.inner.config();
        let (enabled, disposed) = {
            let core = self.inner.lock_core();
            (core.is_enabled(), core.is_disposed())
        };

        if disposed {
            debug!(path = %resource.path().display(), "save after dispose ignored");
            return None;
        }

        if !enabled || config.commands().is_empty() {
            self.show_status_message();
            self.inner.refresh_status();
            return None;
        }

        let settings = config.settings();
        if settings.auto_clear_console {
            self.inner.sink.clear();
        }

        let path_str = resource.path().to_string_lossy();
        let matched = matching_commands(config.commands(), &path_str);
        if matched.is_empty() {
            debug!(path = %path_str, "no command matches saved file");
            return None;
        }

        let folder = self.inner.workspace.resolve_root(resource.path());
        let cwd = std::env::current_dir().unwrap_or_else(|err| {
            warn!(error = %err, "cannot read current directory; using \".\"");
            PathBuf::from(".")
        });
        let replacements = Replacements::for_file(resource.path(), &folder, &cwd);

        info!(
            path = %path_str,
            kind = ?resource.kind(),
            commands = matched.len(),
            "running commands for saved file"
        );

        self.inner.message_if_defined(settings.message.as_deref());

        self.inner.begin_batch(resource.path());
        let started = Instant::now();
        let mut receivers = Vec::with_capacity(matched.len());
        for rule in matched {
            let command = ResolvedCommand::resolve(rule.config(), &replacements);
            let (job, done) = QueuedJob::new(command, resource.path().to_path_buf(), folder.clone());
            receivers.push(done);

            match job.lane {
                Lane::Parallel => self.inner.launch_parallel(job),
                Lane::Sequential => self.inner.enqueue(job),
            }
        }

        let handle = tokio::spawn(await_batch(
            Arc::clone(&self.inner),
            Arc::clone(&config),
            resource.path().to_path_buf(),
            receivers,
            started,
        ));
        Some(BatchHandle { handle })
    }

    pub fn enable(&self) {
        {
            let mut core = self.inner.lock_core();
            if core.is_disposed() || !core.set_enabled(true) {
                return;
            }
        }
        self.inner.persist_enabled(true);
        self.show_status_message();
        self.inner.refresh_status();
    }

    /// Disable and abort all work: queued jobs are discarded, running
    /// processes receive their kill signal.
    pub fn disable(&self) {
        {
            let mut core = self.inner.lock_core();
            if core.is_disposed() {
                return;
            }
            core.set_enabled(false);
        }
        self.inner.persist_enabled(false);
        self.show_status_message();
        self.inner.abort_all();
        self.inner.refresh_status();
    }

    /// Terminal teardown: abort everything and stop the sequential runner.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        {
            let mut core = self.inner.lock_core();
            if core.is_disposed() {
                return;
            }
            core.mark_disposed();
        }
        info!("disposing orchestrator");
        self.inner.abort_all();
        self.inner.wake.notify_one();
        self.inner.refresh_status();
    }

    /// `dispose`, then wait for the sequential runner to exit.
    pub async fn shutdown(&self) {
        self.dispose();
        let handle = self
            .inner
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "sequential runner ended abnormally");
            }
        }
    }

    /// True while a batch triggered by a save of `path` is in flight, and
    /// for [`SETTLE_WINDOW`] after the last one settles.
    ///
    /// The watcher uses this to tell a command's own writes to the saved
    /// file apart from user saves.
    pub fn ran_recently(&self, path: &Path) -> bool {
        let mut recent = self.inner.lock_recent();
        let Some(activity) = recent.get(path) else {
            return false;
        };
        if activity.is_recent() {
            return true;
        }
        recent.remove(path);
        false
    }

    /// Resolve once nothing is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.inner.lock_core().activity() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn lock_core(&self) -> MutexGuard<'_, CoreState> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_recent(&self) -> MutexGuard<'_, HashMap<PathBuf, PathActivity>> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_batch(&self, path: &Path) {
        self.lock_recent()
            .entry(path.to_path_buf())
            .or_default()
            .in_flight += 1;
    }

    fn end_batch(&self, path: &Path) {
        let mut recent = self.lock_recent();
        recent.retain(|_, activity| activity.is_recent());
        let activity = recent.entry(path.to_path_buf()).or_default();
        activity.in_flight = activity.in_flight.saturating_sub(1);
        activity.settled_at = Some(Instant::now());
    }

    fn config(&self) -> Arc<ConfigFile> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn message(&self, text: &str) {
        self.sink.append_line(text);
    }

    fn message_if_defined(&self, text: Option<&str>) {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.message(text);
        }
    }

    fn refresh_status(&self) {
        let snapshot = self.lock_core().snapshot();
        self.status.update(&snapshot);
        if snapshot.activity() == 0 {
            self.idle.notify_waiters();
        }
    }

    fn persist_enabled(&self, value: bool) {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = flags.update(ENABLED_KEY, value) {
            warn!(value, error = %err, "failed to persist enabled flag");
        }
    }

    fn enqueue(&self, job: QueuedJob) {
        debug!(cmd = %job.command.label(), "queueing sequential command");
        self.lock_core().enqueue(job);
        self.wake.notify_one();
        self.refresh_status();
    }

    fn launch_parallel(self: &Arc<Self>, job: QueuedJob) {
        let abort = {
            let mut core = self.lock_core();
            core.start_parallel();
            core.abort_token()
        };
        self.refresh_status();

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = inner.execute(&job.command, &job.cwd, abort).await;
            inner.report_completion(&job.command, &result);
            inner.lock_core().finish_parallel();
            inner.refresh_status();
            job.complete(result);
        });
    }

    fn abort_all(&self) {
        let (discarded, running) = {
            let mut core = self.lock_core();
            let discarded = core.abort_all();
            (discarded, core.activity())
        };

        if !discarded.is_empty() {
            info!(count = discarded.len(), "discarding queued commands");
        }
        for job in discarded {
            job.discard();
        }

        if running > 0 {
            info!(running, "signalled running commands to stop");
            self.message(&format!(
                "Run On Save: stopping {running} running command(s)."
            ));
        }
    }

    /// Run one command to completion. Never fails: spawn errors become a
    /// message plus [`SPAWN_FAILURE_STATUS`].
    async fn execute(&self, command: &ResolvedCommand, cwd: &Path, abort: AbortToken) -> ExecResult {
        self.message_if_defined(command.message.as_deref());

        if command.output_panel == OutputPanelPolicy::Always {
            self.sink.show(true);
        }

        let Some(command_line) = command.command_line() else {
            return ExecResult::immediate();
        };

        let request = LaunchRequest {
            command: command_line.to_string(),
            shell: self.config().settings().shell.clone(),
            cwd: cwd.to_path_buf(),
            abort,
            kill_signal: command.kill_signal,
        };

        let started = Instant::now();
        let status_code = match self.launcher.launch(request, Arc::clone(&self.sink)).await {
            Ok(code) => code,
            Err(err) => {
                warn!(cmd = %command_line, error = %err, "command failed to start");
                self.message(&err.to_string());
                SPAWN_FAILURE_STATUS
            }
        };

        ExecResult {
            status_code,
            elapsed: started.elapsed(),
        }
    }

    fn report_completion(&self, command: &ResolvedCommand, result: &ExecResult) {
        self.message_if_defined(command.message_after.as_deref());

        if command.show_elapsed {
            self.message(&format!("Elapsed ms: {}", result.elapsed.as_millis()));
        }

        if command.output_panel == OutputPanelPolicy::Error && !result.success() {
            self.sink.show(true);
        }
    }
}

/// The single sequential worker. Exits only after `dispose`.
async fn sequential_loop(inner: Arc<Inner>) {
    info!("sequential runner started");

    loop {
        let next = {
            let mut core = inner.lock_core();
            if core.is_disposed() {
                break;
            }
            core.pop_sequential().map(|job| (job, core.abort_token()))
        };

        let Some((job, abort)) = next else {
            inner.wake.notified().await;
            continue;
        };

        inner.refresh_status();
        let result = inner.execute(&job.command, &job.cwd, abort).await;
        inner.report_completion(&job.command, &result);
        inner.lock_core().finish_sequential();
        inner.refresh_status();
        job.complete(result);
    }

    info!("sequential runner stopped");
}

/// Wait for every job of one batch, then print the batch summary.
async fn await_batch(
    inner: Arc<Inner>,
    config: Arc<ConfigFile>,
    path: PathBuf,
    receivers: Vec<oneshot::Receiver<JobOutcome>>,
    started: Instant,
) -> BatchReport {
    let mut report = BatchReport::default();

    for done in receivers {
        match done.await {
            Ok(JobOutcome::Completed(result)) if result.success() => report.succeeded += 1,
            Ok(JobOutcome::Completed(_)) => report.failed += 1,
            // A dropped sender means the job never reported; count it as
            // discarded so the batch still settles.
            Ok(JobOutcome::Discarded) | Err(_) => report.discarded += 1,
        }
    }
    report.elapsed = started.elapsed();
    inner.end_batch(&path);

    debug!(?report, "batch settled");
    if report.ran() == 0 {
        return report;
    }

    let settings = config.settings();
    inner.message_if_defined(settings.message_after.as_deref());
    if settings.show_elapsed {
        inner.message(&format!("Total elapsed ms: {}", report.elapsed.as_millis()));
    }

    report
}
