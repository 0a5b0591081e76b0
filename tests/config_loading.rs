use std::error::Error;
use std::fs;

use runonsave::config::{load_and_validate, parse_and_validate};
use runonsave::errors::RunOnSaveError;
use runonsave::types::{KillSignal, OutputPanelPolicy};

type TestResult = Result<(), Box<dyn Error>>;

const FULL_CONFIG: &str = r#"
[config]
shell = "/bin/bash"
auto_clear_console = true
ignore_unchanged_files = true
message = "saving ${fileBasename}"
message_after = "saved"
show_elapsed = true

[[commands]]
match = "\\.rs$"
not_match = "/target/"
cmd = "rustfmt ${file}"
message = "formatting"
message_after = "formatted"
show_elapsed = true
auto_show_output_panel = "error"
kill_signal = "SIGINT"

[[commands]]
match = "\\.py$"
cmd = "ruff check ${file}"
is_parallel = true
auto_show_output_panel = "always"
kill_signal = "kill"
"#;

#[test]
fn loads_every_field_from_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("RunOnSave.toml");
    fs::write(&path, FULL_CONFIG)?;

    let cfg = load_and_validate(&path)?;

    let settings = cfg.settings();
    assert_eq!(settings.shell.as_deref(), Some("/bin/bash"));
    assert!(settings.auto_clear_console);
    assert!(settings.ignore_unchanged_files);
    assert_eq!(settings.message.as_deref(), Some("saving ${fileBasename}"));
    assert_eq!(settings.message_after.as_deref(), Some("saved"));
    assert!(settings.show_elapsed);

    let rules = cfg.commands();
    assert_eq!(rules.len(), 2);

    let rust = rules[0].config();
    assert_eq!(rust.cmd.as_deref(), Some("rustfmt ${file}"));
    assert!(!rust.is_async);
    assert!(rust.show_elapsed);
    assert_eq!(rust.auto_show_output_panel, OutputPanelPolicy::Error);
    assert_eq!(rust.kill_signal, KillSignal::Int);
    assert!(rules[0].matches("/w/src/main.rs"));
    assert!(!rules[0].matches("/w/target/gen.rs"));

    let python = rules[1].config();
    assert!(python.is_async, "is_parallel is an alias of is_async");
    assert_eq!(python.auto_show_output_panel, OutputPanelPolicy::Always);
    assert_eq!(python.kill_signal, KillSignal::Kill);
    Ok(())
}

#[test]
fn defaults_apply_to_a_minimal_command() -> TestResult {
    let cfg = parse_and_validate(
        r#"
[[commands]]
cmd = "make"
"#,
    )?;

    let settings = cfg.settings();
    assert_eq!(settings.shell, None);
    assert!(!settings.auto_clear_console);
    assert!(!settings.ignore_unchanged_files);

    let command = cfg.commands()[0].config();
    assert!(!command.is_async);
    assert_eq!(command.auto_show_output_panel, OutputPanelPolicy::Never);
    assert_eq!(command.kill_signal, KillSignal::Term);
    // No `match` means every path matches.
    assert!(cfg.commands()[0].matches("/anything/at/all"));
    Ok(())
}

#[test]
fn invalid_regex_names_command_index_and_field() {
    let result = parse_and_validate(
        r#"
[[commands]]
cmd = "ok"

[[commands]]
match = "["
cmd = "broken"
"#,
    );

    match result {
        Err(err @ RunOnSaveError::InvalidPattern { .. }) => {
            assert!(err.to_string().contains("commands[1].match"), "{err}");
        }
        other => panic!("expected InvalidPattern, got {other:?}"),
    }
}

#[test]
fn unknown_kill_signal_is_a_toml_error() {
    let result = parse_and_validate(
        r#"
[[commands]]
cmd = "x"
kill_signal = "SIGHUP"
"#,
    );
    assert!(matches!(result, Err(RunOnSaveError::TomlError(_))));
}

#[test]
fn unknown_output_panel_policy_is_a_toml_error() {
    let result = parse_and_validate(
        r#"
[[commands]]
cmd = "x"
auto_show_output_panel = "sometimes"
"#,
    );
    assert!(matches!(result, Err(RunOnSaveError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("nope.toml"));
    assert!(matches!(result, Err(RunOnSaveError::IoError(_))));
}
