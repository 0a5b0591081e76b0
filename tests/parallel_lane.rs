use std::error::Error;

use runonsave::engine::OrchestratorStatus;
use runonsave::types::Resource;
use runonsave_test_utils::builders::{CommandConfigBuilder, ConfigFileBuilder};
use runonsave_test_utils::fake_launcher::Behaviour;
use runonsave_test_utils::{Harness, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn parallel_commands_overlap() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_command(CommandConfigBuilder::new("P1").parallel().build())
        .with_command(CommandConfigBuilder::new("P2").parallel().build())
        .build();
    let h = Harness::start(cfg);
    h.launcher.set("P1", Behaviour::Hold);
    h.launcher.set("P2", Behaviour::Hold);

    let batch = h
        .orchestrator
        .run_commands(&Resource::text_document("/w/x.rs", true))
        .ok_or("no batch")?;

    with_timeout(h.launcher.wait_started("P1")).await;
    with_timeout(h.launcher.wait_started("P2")).await;
    assert_eq!(h.orchestrator.status().parallel, 2);
    assert_eq!(h.orchestrator.status().status, OrchestratorStatus::Running);

    h.launcher.release("P2");
    h.launcher.release("P1");
    let report = with_timeout(batch.wait()).await;

    assert_eq!(report.succeeded, 2);
    let events = h.launcher.events();
    assert_eq!(&events[..2], &["P1:start", "P2:start"]);
    Ok(())
}

#[tokio::test]
async fn parallel_command_does_not_wait_for_sequential_lane() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_command(CommandConfigBuilder::new("S").build())
        .with_command(CommandConfigBuilder::new("P").parallel().build())
        .build();
    let h = Harness::start(cfg);
    h.launcher.set("S", Behaviour::Hold);
    h.launcher.set("P", Behaviour::Exit(0));

    let batch = h
        .orchestrator
        .run_commands(&Resource::text_document("/w/x.rs", true))
        .ok_or("no batch")?;

    with_timeout(h.launcher.wait_event("P:end")).await;
    with_timeout(h.launcher.wait_started("S")).await;
    assert!(!h.launcher.events().contains(&"S:end".to_string()));

    let busy = h.orchestrator.status();
    assert_eq!(busy.sequential, 1);
    assert_eq!(busy.parallel, 0);

    h.launcher.release("S");
    let report = with_timeout(batch.wait()).await;
    assert_eq!(report.succeeded, 2);
    Ok(())
}

#[tokio::test]
async fn parallel_commands_of_different_saves_overlap_too() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_command(CommandConfigBuilder::new("check ${fileBasename}").parallel().build())
        .build();
    let h = Harness::start(cfg);
    h.launcher.set("check a.rs", Behaviour::Hold);

    let first = h
        .orchestrator
        .run_commands(&Resource::text_document("/w/a.rs", true))
        .ok_or("no batch")?;
    let second = h
        .orchestrator
        .run_commands(&Resource::text_document("/w/b.rs", true))
        .ok_or("no batch")?;

    // b finishes while a is still held.
    let report = with_timeout(second.wait()).await;
    assert_eq!(report.succeeded, 1);
    assert!(h.launcher.started("check a.rs"));
    assert!(!h.launcher.events().contains(&"check a.rs:end".to_string()));

    h.launcher.release("check a.rs");
    with_timeout(first.wait()).await;
    Ok(())
}
