#![cfg(unix)]

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use jest_lsp::check::check_file;
use jest_lsp::engine::CycleOutcome;
use jest_lsp::errors::JestLspError;
use jest_lsp::runner::{LaunchSpec, ProcessRunnerFactory, RunnerAdapter, RunnerEvent, RunnerProcess};

type TestResult = Result<(), Box<dyn Error>>;

const PAYLOAD: &str = r#"{"success":false,"numFailedTests":1,"testResults":[{"name":"sum.spec.ts","status":"failed","assertionResults":[{"status":"failed","title":"adds","fullName":"sum adds","failureMessages":["expected 3"],"location":{"line":4,"column":2}}]}]}"#;

/// Write an executable shell script that plays the part of the test runner.
fn fake_runner(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-jest");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn spec(program: PathBuf, dir: &Path) -> LaunchSpec {
    LaunchSpec {
        command: "jest".to_string(),
        program: program.clone(),
        args: vec!["--json".to_string()],
        target_path: dir.join("sum.spec.ts"),
        working_directory: dir.to_path_buf(),
        binary_override_path: Some(program),
    }
}

/// Drain events up to and including the terminal one.
async fn collect(mut rx: mpsc::Receiver<RunnerEvent>) -> Vec<RunnerEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

#[tokio::test]
async fn json_output_becomes_results_ready() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(dir.path(), &format!("echo 'warming up' >&2\necho '{PAYLOAD}'\nexit 1"));

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let events = with_timeout(collect(process.start()?)).await;

    assert!(events.contains(&RunnerEvent::StderrChunk("warming up".to_string())));
    assert!(events.contains(&RunnerEvent::ProcessExited(1)));
    assert!(events.contains(&RunnerEvent::ProcessClosed));

    match events.last() {
        Some(RunnerEvent::ResultsReady(results)) => {
            assert_eq!(results.num_failed_tests, 1);
            assert_eq!(results.test_results[0].assertion_results[0].title, "adds");
        }
        other => panic!("expected ResultsReady, got {other:?}"),
    }

    process.close_process();
    process.close_process();
    assert!(process.is_closed());
    Ok(())
}

#[tokio::test]
async fn arguments_and_target_are_passed_in_order() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    // Echo the arguments back on stderr so they show up as events.
    let program = fake_runner(dir.path(), "for a in \"$@\"; do echo \"arg:$a\" >&2; done\necho not-json");

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let events = with_timeout(collect(process.start()?)).await;

    let args: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunnerEvent::StderrChunk(line) => line.strip_prefix("arg:").map(str::to_string),
            _ => None,
        })
        .collect();
    assert_eq!(
        args,
        vec!["--json".to_string(), dir.path().join("sum.spec.ts").display().to_string()]
    );
    assert_eq!(events.last(), Some(&RunnerEvent::RawOutputComplete));
    Ok(())
}

#[tokio::test]
async fn non_utf8_stderr_does_not_break_the_run() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(
        dir.path(),
        "printf 'caf\\351\\n' >&2\nsleep 0.3\necho more >&2\necho '{\"testResults\":[]}'",
    );

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let events = with_timeout(collect(process.start()?)).await;

    assert!(events.contains(&RunnerEvent::StderrChunk("caf\u{FFFD}".to_string())));
    assert!(events.contains(&RunnerEvent::StderrChunk("more".to_string())));
    assert!(events.contains(&RunnerEvent::ProcessExited(0)));
    match events.last() {
        Some(RunnerEvent::ResultsReady(results)) => assert!(results.test_results.is_empty()),
        other => panic!("expected ResultsReady, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn silent_crash_is_a_launch_failure() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(dir.path(), "exit 127");

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let events = with_timeout(collect(process.start()?)).await;

    assert!(matches!(events.last(), Some(RunnerEvent::FatalLaunchError(_))));
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_launch_failure() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let mut process = RunnerProcess::new(spec(dir.path().join("does-not-exist"), dir.path()));
    let events = with_timeout(collect(process.start()?)).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        RunnerEvent::FatalLaunchError(reason) => assert!(reason.contains("does-not-exist")),
        other => panic!("expected FatalLaunchError, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn starting_twice_is_rejected() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(dir.path(), "exec sleep 5");

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let _events = process.start()?;

    assert!(matches!(
        process.start(),
        Err(JestLspError::RunnerAlreadyStarted(_))
    ));

    process.close_process();
    assert!(process.is_closed());
    Ok(())
}

#[tokio::test]
async fn closing_a_running_process_stops_its_events() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(dir.path(), "exec sleep 5");

    let mut process = RunnerProcess::new(spec(program, dir.path()));
    let mut rx = process.start()?;
    process.close_process();

    // The sender is dropped once the killed process is reaped.
    let next = with_timeout(rx.recv()).await;
    assert!(!matches!(next, Some(RunnerEvent::ResultsReady(_))));
    Ok(())
}

#[tokio::test]
async fn check_mode_runs_the_configured_binary() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let program = fake_runner(dir.path(), &format!("echo '{PAYLOAD}'\nexit 1"));
    let target = dir.path().join("sum.spec.ts");
    fs::write(&target, "test('adds', () => {})\n")?;

    let config = ConfigFileBuilder::new().binary_override(&program).build();
    let report = check_file(&config, &target, Arc::new(ProcessRunnerFactory::new())).await?;

    assert_eq!(report.outcome, CycleOutcome::Published { diagnostics: 1 });
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].message, "expected 3");
    assert_eq!(report.diagnostics[0].range.start.line, 4);
    Ok(())
}

#[tokio::test]
async fn check_mode_skips_non_test_files() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let target = dir.path().join("index.ts");
    fs::write(&target, "export {}\n")?;

    let config = ConfigFileBuilder::new()
        .binary_override(dir.path().join("never-run"))
        .build();
    let report = check_file(&config, &target, Arc::new(ProcessRunnerFactory::new())).await?;

    assert_eq!(report.outcome, CycleOutcome::NotCandidate);
    assert!(report.diagnostics.is_empty());
    Ok(())
}
