#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use runonsave::errors::RunOnSaveError;
use runonsave::exec::{LaunchFuture, LaunchRequest, ProcessLauncher};
use runonsave::output::OutputSink;

/// How the fake treats one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Finish immediately with this status.
    Exit(i32),
    /// Finish after a delay with this status (abortable).
    Delay(Duration, i32),
    /// Run until `release` (status 0) or abort.
    Hold,
    /// Fail to start.
    SpawnError,
}

/// A fake launcher that:
/// - records `"<cmd>:start"`, `"<cmd>:end"` and `"<cmd>:killed:<SIGNAL>"`
///   events in order,
/// - writes `"<cmd> output"` to the sink for every command it runs,
/// - reports `128 + signo` for aborted commands, like a real shell.
///
/// Commands without an explicit behaviour take `default_delay` and exit 0.
#[derive(Clone)]
pub struct FakeLauncher {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    events: Mutex<Vec<String>>,
    requests: Mutex<Vec<LaunchRequest>>,
    behaviours: Mutex<HashMap<String, Behaviour>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    default_delay: Duration,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::with_default_delay(Duration::from_millis(20))
    }

    pub fn with_default_delay(default_delay: Duration) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                events: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                behaviours: Mutex::new(HashMap::new()),
                gates: Mutex::new(HashMap::new()),
                default_delay,
            }),
        }
    }

    pub fn set(&self, command: &str, behaviour: Behaviour) {
        self.inner
            .behaviours
            .lock()
            .unwrap()
            .insert(command.to_string(), behaviour);
    }

    /// Let a held command finish. A release before the start is remembered.
    pub fn release(&self, command: &str) {
        self.inner.gate(command).notify_one();
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.events.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn started(&self, command: &str) -> bool {
        self.events().contains(&format!("{command}:start"))
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Poll until `command` has started. Wrap in `with_timeout`.
    pub async fn wait_started(&self, command: &str) {
        while !self.started(command) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until `event` has been recorded. Wrap in `with_timeout`.
    pub async fn wait_event(&self, event: &str) {
        while !self.events().iter().any(|e| e == event) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInner {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn gate(&self, command: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(command.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }

    fn behaviour(&self, command: &str) -> Behaviour {
        self.behaviours
            .lock()
            .unwrap()
            .get(command)
            .copied()
            .unwrap_or(Behaviour::Delay(self.default_delay, 0))
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, request: LaunchRequest, sink: Arc<dyn OutputSink>) -> LaunchFuture {
        let inner = Arc::clone(&self.inner);

        Box::pin(async move {
            let cmd = request.command.clone();
            let behaviour = inner.behaviour(&cmd);
            inner.requests.lock().unwrap().push(request.clone());

            if behaviour == Behaviour::SpawnError {
                return Err(RunOnSaveError::Spawn {
                    command: cmd,
                    source: io::Error::new(io::ErrorKind::NotFound, "fake spawn failure"),
                });
            }

            inner.record(format!("{cmd}:start"));

            let finished = match behaviour {
                Behaviour::Exit(code) => Some(code),
                Behaviour::Delay(delay, code) => tokio::select! {
                    _ = tokio::time::sleep(delay) => Some(code),
                    _ = request.abort.cancelled() => None,
                },
                Behaviour::Hold => {
                    let gate = inner.gate(&cmd);
                    tokio::select! {
                        _ = gate.notified() => Some(0),
                        _ = request.abort.cancelled() => None,
                    }
                }
                Behaviour::SpawnError => unreachable!(),
            };

            match finished {
                Some(code) => {
                    sink.append_line(&format!("{cmd} output"));
                    inner.record(format!("{cmd}:end"));
                    Ok(code)
                }
                None => {
                    let signal = request.kill_signal;
                    inner.record(format!("{cmd}:killed:{}", signal.as_str()));
                    Ok(128 + signal.number())
                }
            }
        })
    }
}
