#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use runonsave::engine::AbortToken;
use runonsave::errors::RunOnSaveError;
use runonsave::exec::{LaunchRequest, ProcessLauncher, ShellLauncher};
use runonsave::types::KillSignal;
use runonsave_test_utils::sink::MemorySink;
use runonsave_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn request(command: &str, dir: &std::path::Path) -> LaunchRequest {
    LaunchRequest {
        command: command.to_string(),
        shell: None,
        cwd: dir.to_path_buf(),
        abort: AbortToken::new(),
        kill_signal: KillSignal::Term,
    }
}

#[tokio::test]
async fn forwards_stdout_and_stderr_and_reports_exit_code() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());

    let code = with_timeout(ShellLauncher::new().launch(
        request("echo out; echo err 1>&2; exit 3", dir.path()),
        sink.clone(),
    ))
    .await?;

    assert_eq!(code, 3);
    let output = sink.contents();
    assert!(output.contains("out\n"));
    assert!(output.contains("err\n"));
    Ok(())
}

#[tokio::test]
async fn runs_in_the_requested_directory() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());

    let code =
        with_timeout(ShellLauncher::new().launch(request("touch marker", dir.path()), sink.clone())).await?;

    assert_eq!(code, 0);
    assert!(dir.path().join("marker").exists());
    Ok(())
}

#[tokio::test]
async fn custom_shell_is_used() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());
    let mut req = request("echo $0", dir.path());
    req.shell = Some("/bin/sh".to_string());

    let code = with_timeout(ShellLauncher::new().launch(req, sink.clone())).await?;

    assert_eq!(code, 0);
    assert_eq!(sink.contents().trim(), "/bin/sh");
    Ok(())
}

#[tokio::test]
async fn missing_shell_is_a_spawn_error() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());
    let mut req = request("true", dir.path());
    req.shell = Some("/definitely/not/a/shell".to_string());

    let result = with_timeout(ShellLauncher::new().launch(req, sink)).await;

    match result {
        Err(RunOnSaveError::Spawn { command, .. }) => assert_eq!(command, "true"),
        other => panic!("expected spawn error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn abort_signals_the_process() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());
    let req = request("exec sleep 30", dir.path());
    let abort = req.abort.clone();

    let started = Instant::now();
    let run = tokio::spawn(ShellLauncher::new().launch(req, sink));
    tokio::time::sleep(Duration::from_millis(100)).await;
    abort.cancel();

    let code = with_timeout(run).await??;
    assert_eq!(code, 128 + 15);
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn abort_with_sigkill() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());
    let mut req = request("exec sleep 30", dir.path());
    req.kill_signal = KillSignal::Kill;
    let abort = req.abort.clone();

    let run = tokio::spawn(ShellLauncher::new().launch(req, sink));
    tokio::time::sleep(Duration::from_millis(100)).await;
    abort.cancel();

    let code = with_timeout(run).await??;
    assert_eq!(code, 128 + 9);
    Ok(())
}

#[tokio::test]
async fn background_child_holding_pipes_does_not_delay_exit() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());

    let started = Instant::now();
    let code = with_timeout(
        ShellLauncher::new().launch(request("sleep 30 & echo started", dir.path()), sink.clone()),
    )
    .await?;

    assert_eq!(code, 0);
    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    assert!(sink.contains("started"));
    Ok(())
}

#[tokio::test]
async fn abort_while_draining_output_resolves_the_launch() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let sink = Arc::new(MemorySink::new());
    let req = request("sleep 30 & echo started", dir.path());
    let abort = req.abort.clone();

    // A drain grace far beyond the test timeout: only the abort can end it.
    let launcher = ShellLauncher::with_drain_grace(Duration::from_secs(60));
    let run = tokio::spawn(launcher.launch(req, sink));
    tokio::time::sleep(Duration::from_millis(300)).await;
    abort.cancel();

    let code = with_timeout(run).await??;
    assert_eq!(code, 0, "the shell itself had already exited cleanly");
    Ok(())
}
