pub mod builders;
pub mod fake_launcher;
pub mod sink;

use std::path::PathBuf;
use std::sync::{Arc, Once};

use runonsave::config::ConfigFile;
use runonsave::engine::{Orchestrator, OrchestratorDeps};
use runonsave::state::{FlagStore, MemoryFlagStore};
use runonsave::workspace::WorkspaceFolders;
use tracing_subscriber::{EnvFilter, fmt};

use crate::fake_launcher::FakeLauncher;
use crate::sink::{MemorySink, RecordingStatus};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// An orchestrator wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub launcher: FakeLauncher,
    pub sink: Arc<MemorySink>,
    pub status: Arc<RecordingStatus>,
}

impl Harness {
    /// Workspace root `/w`, in-memory flags, enabled.
    pub fn start(config: ConfigFile) -> Self {
        Self::start_with(config, FakeLauncher::new(), Box::new(MemoryFlagStore::new()))
    }

    pub fn start_with(config: ConfigFile, launcher: FakeLauncher, flags: Box<dyn FlagStore>) -> Self {
        let sink = Arc::new(MemorySink::new());
        let status = Arc::new(RecordingStatus::new());

        let orchestrator = Orchestrator::start(
            config,
            OrchestratorDeps {
                launcher: Arc::new(launcher.clone()),
                sink: sink.clone(),
                status: status.clone(),
                flags,
                workspace: WorkspaceFolders::new([PathBuf::from("/w")]),
            },
        );

        Self {
            orchestrator,
            launcher,
            sink,
            status,
        }
    }
}
