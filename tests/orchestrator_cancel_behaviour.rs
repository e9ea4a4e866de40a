mod common;
use crate::common::builders::{failing, ConfigFileBuilder, ResultsBuilder};
use crate::common::fake_runner::{script, ScriptedRunnerFactory};
use crate::common::{file_uri, init_tracing, with_timeout};

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

use jest_lsp::config::ConfigFile;
use jest_lsp::engine::{
    ClientSink, CycleOutcome, DocumentEvent, Orchestrator, RecordingSink, ValidationContext,
};
use jest_lsp::fs::mock::MockFileSystem;
use jest_lsp::results::TestRunResults;
use jest_lsp::types::OverlapBehaviour;

type TestResult = Result<(), Box<dyn Error>>;

fn setup(
    config: &ConfigFile,
    factory: &Arc<ScriptedRunnerFactory>,
) -> Result<(Orchestrator, Arc<RecordingSink>), Box<dyn Error>> {
    let sink = Arc::new(RecordingSink::new());
    let ctx = ValidationContext::new(config, factory.clone(), sink.clone())?
        .with_filesystem(Arc::new(MockFileSystem::new()));
    Ok((Orchestrator::new(ctx, config.validation.overlap), sink))
}

fn payload(message: &str) -> TestRunResults {
    ResultsBuilder::new()
        .file("/work/proj/src/a.spec.ts", vec![failing("t", &[message], 1, 0)])
        .build()
}

/// Records like [`RecordingSink`], but the first non-empty publish waits
/// until the test releases it.
#[derive(Default)]
struct HeldSink {
    inner: RecordingSink,
    held_once: AtomicBool,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ClientSink for HeldSink {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        if !diagnostics.is_empty() && !self.held_once.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.publish_diagnostics(uri, diagnostics).await;
    }

    async fn log_message(&self, level: MessageType, message: String) {
        self.inner.log_message(level, message).await;
    }
}

async fn wait_for_launches(factory: &ScriptedRunnerFactory, n: usize) {
    with_timeout(async {
        while factory.launch_count() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

#[tokio::test]
async fn newer_cycle_cancels_running_one() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().overlap(OverlapBehaviour::Cancel).build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::results(payload("fresh"))));
    factory.push_script(script::hang());
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("src/a.spec.ts");
    let first = orchestrator.on_document_event(DocumentEvent::Changed, uri.clone());
    wait_for_launches(&factory, 1).await;

    let second = orchestrator.on_document_event(DocumentEvent::Saved, uri.clone());

    assert_eq!(with_timeout(first).await?, CycleOutcome::Cancelled);
    assert_eq!(with_timeout(second).await?, CycleOutcome::Published { diagnostics: 1 });

    let launches = factory.launches();
    assert_eq!(launches.len(), 2);
    assert!(launches[0].is_closed(), "superseded runner must be torn down");

    let current = sink.current();
    assert_eq!(current[&uri].len(), 1);
    assert_eq!(current[&uri][0].message, "fresh");
    assert_eq!(orchestrator.active_cycles(&uri), 0);
    Ok(())
}

#[tokio::test]
async fn cancelled_cycle_stops_publishing_midway_through_results() -> TestResult {
    init_tracing();

    let stale = ResultsBuilder::new()
        .file("/work/proj/src/a.spec.ts", vec![failing("t", &["stale1"], 1, 0)])
        .file("/work/proj/src/b.spec.ts", vec![failing("t", &["stale2"], 2, 0)])
        .build();

    let config = ConfigFileBuilder::new().overlap(OverlapBehaviour::Cancel).build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::raw_output()));
    factory.push_script(script::results(stale));

    let sink = Arc::new(HeldSink::default());
    let ctx = ValidationContext::new(&config, factory.clone(), sink.clone())?
        .with_filesystem(Arc::new(MockFileSystem::new()));
    let orchestrator = Orchestrator::new(ctx, config.validation.overlap);

    let uri = file_uri("src/a.spec.ts");
    let first = orchestrator.on_document_event(DocumentEvent::Saved, uri.clone());
    // The first cycle is now stuck inside its first per-file publish.
    with_timeout(sink.entered.notified()).await;

    let second = orchestrator.on_document_event(DocumentEvent::Saved, uri.clone());
    sink.release.notify_one();

    assert_eq!(with_timeout(first).await?, CycleOutcome::Cancelled);
    assert_eq!(with_timeout(second).await?, CycleOutcome::Unstructured);

    let publishes = sink.inner.publishes_for(&uri);
    assert_eq!(
        publishes.last(),
        Some(&Vec::new()),
        "the newer cycle's clear must be the last word"
    );
    assert!(
        publishes.iter().all(|set| set.len() <= 1),
        "the second stale file must never be published"
    );
    assert!(sink.inner.current()[&uri].is_empty());
    assert!(factory.all_closed());
    Ok(())
}

#[tokio::test]
async fn parallel_cycles_both_publish_and_last_finisher_wins() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().overlap(OverlapBehaviour::Parallel).build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::results(payload("second"))));
    factory.push_script(script::delayed_results(Duration::from_millis(100), payload("first")));
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("src/a.spec.ts");
    let first = orchestrator.on_document_event(DocumentEvent::Changed, uri.clone());
    wait_for_launches(&factory, 1).await;
    let second = orchestrator.on_document_event(DocumentEvent::Saved, uri.clone());

    assert_eq!(with_timeout(second).await?, CycleOutcome::Published { diagnostics: 1 });
    assert_eq!(with_timeout(first).await?, CycleOutcome::Published { diagnostics: 1 });

    // The slower, older run finished last, so its set is what the editor shows.
    assert_eq!(sink.current()[&uri][0].message, "first");
    assert!(factory.all_closed());
    Ok(())
}

#[tokio::test]
async fn debounce_coalesces_bursts_of_events() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().debounce("100ms").build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::results(payload("once"))));
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("src/a.spec.ts");
    let handles: Vec<_> = (0..3)
        .map(|_| orchestrator.on_document_event(DocumentEvent::Changed, uri.clone()))
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(with_timeout(handle).await?);
    }

    assert_eq!(
        outcomes,
        vec![
            CycleOutcome::Cancelled,
            CycleOutcome::Cancelled,
            CycleOutcome::Published { diagnostics: 1 },
        ]
    );
    assert_eq!(factory.launch_count(), 1);

    // Debounced cycles never got as far as clearing the document.
    assert_eq!(sink.publishes_for(&uri).len(), 2);
    Ok(())
}

#[tokio::test]
async fn non_test_files_skip_the_debounce() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().debounce("10s").build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::hang()));
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("README.md");
    let outcome = with_timeout(orchestrator.on_document_event(DocumentEvent::Saved, uri.clone())).await?;

    assert_eq!(outcome, CycleOutcome::NotCandidate);
    assert_eq!(sink.publishes_for(&uri), vec![Vec::new()]);
    Ok(())
}

#[tokio::test]
async fn hung_runner_is_killed_after_timeout() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().timeout("50ms").build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::hang()));
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("src/a.spec.ts");
    let outcome = with_timeout(orchestrator.on_document_event(DocumentEvent::Saved, uri.clone())).await?;

    assert_eq!(outcome, CycleOutcome::TimedOut);
    assert!(factory.all_closed());
    assert_eq!(sink.publishes_for(&uri), vec![Vec::new()]);
    assert!(
        sink.logs()
            .iter()
            .any(|(level, msg)| *level == MessageType::WARNING && msg.contains("timed out"))
    );
    Ok(())
}

#[tokio::test]
async fn closing_a_document_cancels_its_run_without_publishing() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().build();
    let factory = Arc::new(ScriptedRunnerFactory::new(script::hang()));
    let (orchestrator, sink) = setup(&config, &factory)?;

    let uri = file_uri("src/a.spec.ts");
    let other = file_uri("src/b.spec.ts");
    let handle = orchestrator.on_document_event(DocumentEvent::Opened, uri.clone());
    let other_handle = orchestrator.on_document_event(DocumentEvent::Opened, other.clone());
    wait_for_launches(&factory, 2).await;

    orchestrator.cancel(&uri);
    assert_eq!(with_timeout(handle).await?, CycleOutcome::Cancelled);
    assert_eq!(orchestrator.active_cycles(&uri), 0);
    assert_eq!(orchestrator.active_cycles(&other), 1, "other documents keep running");
    assert_eq!(sink.publishes_for(&uri), vec![Vec::new()]);

    orchestrator.cancel_all();
    assert_eq!(with_timeout(other_handle).await?, CycleOutcome::Cancelled);
    assert!(factory.all_closed());
    Ok(())
}
