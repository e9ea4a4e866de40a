use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use jest_lsp::errors::{JestLspError, Result};
use jest_lsp::results::TestRunResults;
use jest_lsp::runner::{LaunchSpec, RunnerAdapter, RunnerEvent, RunnerFactory};

/// One step of a scripted run.
#[derive(Debug, Clone)]
pub enum Step {
    Emit(RunnerEvent),
    Sleep(Duration),
    /// Keep the stream open without emitting anything else.
    Hang,
}

/// Shorthand scripts for the common cases.
pub mod script {
    use super::*;

    /// A run that exits 1 and prints a results payload.
    pub fn results(payload: TestRunResults) -> Vec<Step> {
        vec![
            Step::Emit(RunnerEvent::ProcessExited(1)),
            Step::Emit(RunnerEvent::ProcessClosed),
            Step::Emit(RunnerEvent::ResultsReady(payload)),
        ]
    }

    /// Same as [`results`] but only after `delay`.
    pub fn delayed_results(delay: Duration, payload: TestRunResults) -> Vec<Step> {
        let mut steps = vec![Step::Sleep(delay)];
        steps.extend(results(payload));
        steps
    }

    /// A run whose output is not a results payload.
    pub fn raw_output() -> Vec<Step> {
        vec![
            Step::Emit(RunnerEvent::StderrChunk("something went wrong".into())),
            Step::Emit(RunnerEvent::ProcessExited(1)),
            Step::Emit(RunnerEvent::ProcessClosed),
            Step::Emit(RunnerEvent::RawOutputComplete),
        ]
    }

    pub fn launch_failure(reason: &str) -> Vec<Step> {
        vec![Step::Emit(RunnerEvent::FatalLaunchError(reason.to_string()))]
    }

    /// A run that never finishes.
    pub fn hang() -> Vec<Step> {
        vec![Step::Hang]
    }
}

/// Record of one adapter created by [`ScriptedRunnerFactory`].
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub spec: LaunchSpec,
    closed: Arc<AtomicBool>,
}

impl LaunchRecord {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A fake runner factory that:
/// - records every launch it is asked for
/// - hands out adapters that replay a script instead of spawning a process.
///
/// Scripts queued with [`ScriptedRunnerFactory::push_script`] are used in
/// order; once they are exhausted the default script is replayed.
#[derive(Debug)]
pub struct ScriptedRunnerFactory {
    default_script: Vec<Step>,
    queued: Mutex<VecDeque<Vec<Step>>>,
    launches: Mutex<Vec<LaunchRecord>>,
}

impl ScriptedRunnerFactory {
    pub fn new(default_script: Vec<Step>) -> Self {
        Self {
            default_script,
            queued: Mutex::new(VecDeque::new()),
            launches: Mutex::new(Vec::new()),
        }
    }

    pub fn push_script(&self, steps: Vec<Step>) {
        self.queued.lock().unwrap().push_back(steps);
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn all_closed(&self) -> bool {
        self.launches().iter().all(LaunchRecord::is_closed)
    }
}

impl RunnerFactory for ScriptedRunnerFactory {
    fn create(&self, spec: LaunchSpec) -> Box<dyn RunnerAdapter> {
        let script = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());

        let closed = Arc::new(AtomicBool::new(false));
        self.launches.lock().unwrap().push(LaunchRecord {
            spec,
            closed: Arc::clone(&closed),
        });

        Box::new(ScriptedRunner {
            script: Some(script),
            closed,
            task: None,
        })
    }
}

struct ScriptedRunner {
    script: Option<Vec<Step>>,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl RunnerAdapter for ScriptedRunner {
    fn start(&mut self) -> Result<mpsc::Receiver<RunnerEvent>> {
        let script = self
            .script
            .take()
            .ok_or_else(|| JestLspError::RunnerAlreadyStarted("scripted runner".into()))?;

        let (tx, rx) = mpsc::channel(16);
        self.task = Some(tokio::spawn(async move {
            for step in script {
                match step {
                    Step::Emit(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Step::Sleep(duration) => tokio::time::sleep(duration).await,
                    Step::Hang => {
                        // Holding `tx` keeps the stream open.
                        std::future::pending::<()>().await;
                    }
                }
            }
        }));

        Ok(rx)
    }

    fn close_process(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ScriptedRunner {
    fn drop(&mut self) {
        self.close_process();
    }
}
