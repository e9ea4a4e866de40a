// src/engine/core.rs

//! Pure validation-cycle state machine.
//!
//! A [`ValidationCycle`] consumes the gate decision and [`RunnerEvent`]s and
//! produces:
//! - an updated phase and diagnostic buffer
//! - a list of [`CycleCommand`]s describing what the IO shell should do next
//!
//! The async shell (`engine::runtime`) owns the runner adapter, the client
//! sink, cancellation and timeouts. Nothing here touches Tokio, channels or
//! processes, so the whole policy is unit tested synchronously.

use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

use crate::diagnostics::DiagnosticMapper;
use crate::results::TestRunResults;
use crate::runner::{RunOutcome, RunnerEvent};

/// `Idle → Running → (Publishing)* → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Running,
    Publishing,
}

/// Command produced by the core, executed by the IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleCommand {
    /// Replace the document's diagnostic set with this one.
    Publish(Vec<Diagnostic>),
    /// Create and start a runner adapter for the document.
    StartRunner,
    /// Close the runner adapter.
    CloseProcess,
    /// Operator-visible log line.
    Log(MessageType, String),
}

/// Decision returned by the core after handling one input.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStep {
    pub commands: Vec<CycleCommand>,
    /// Whether the shell should keep waiting for runner events.
    pub keep_running: bool,
}

impl CycleStep {
    fn finished(commands: Vec<CycleCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }

    fn waiting(commands: Vec<CycleCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Not a test file; nothing was run.
    NotCandidate,
    /// Results were mapped and published.
    Published { diagnostics: usize },
    /// The runner finished without a results payload.
    Unstructured,
    /// The runner could not be launched.
    LaunchFailed,
    /// Superseded by a newer cycle or closed by the editor.
    Cancelled,
    /// The run exceeded the configured timeout.
    TimedOut,
}

/// Why the shell is tearing a cycle down early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    TimedOut,
}

/// State of one validation cycle for one document.
#[derive(Debug)]
pub struct ValidationCycle {
    uri: Url,
    phase: CyclePhase,
    diagnostics: Vec<Diagnostic>,
    mapper: DiagnosticMapper,
    outcome: Option<CycleOutcome>,
}

impl ValidationCycle {
    pub fn new(uri: Url, mapper: DiagnosticMapper) -> Self {
        Self {
            uri,
            phase: CyclePhase::Idle,
            diagnostics: Vec::new(),
            mapper,
            outcome: None,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<CycleOutcome> {
        self.outcome
    }

    /// Diagnostics accumulated so far in this cycle.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Enter `Running`: clear the document, then either start the runner or
    /// stop right away for non-test files.
    pub fn begin(&mut self, is_candidate: bool) -> CycleStep {
        self.phase = CyclePhase::Running;
        self.diagnostics.clear();

        let mut commands = vec![CycleCommand::Publish(Vec::new())];

        if !is_candidate {
            self.finish(CycleOutcome::NotCandidate);
            return CycleStep::finished(commands);
        }

        commands.push(CycleCommand::StartRunner);
        CycleStep::waiting(commands)
    }

    /// Handle one runner event.
    pub fn step(&mut self, event: RunnerEvent) -> CycleStep {
        if self.phase == CyclePhase::Idle {
            return CycleStep::finished(Vec::new());
        }

        let Some(outcome) = event.into_outcome() else {
            // Stderr chunks and exit/close notices never transition.
            return CycleStep::waiting(Vec::new());
        };

        match outcome {
            RunOutcome::Completed(payload) => self.handle_results(&payload),
            RunOutcome::Unstructured => {
                self.finish(CycleOutcome::Unstructured);
                CycleStep::finished(vec![
                    CycleCommand::Log(
                        MessageType::WARNING,
                        format!("test runner produced no structured results for {}", self.uri),
                    ),
                    CycleCommand::CloseProcess,
                ])
            }
            RunOutcome::LaunchFailed(reason) => {
                self.finish(CycleOutcome::LaunchFailed);
                CycleStep::finished(vec![
                    CycleCommand::Log(
                        MessageType::ERROR,
                        format!("test runner failed for {}: {reason}", self.uri),
                    ),
                    CycleCommand::CloseProcess,
                ])
            }
        }
    }

    /// Tear the cycle down without publishing anything further.
    pub fn abort(&mut self, reason: AbortReason) -> CycleStep {
        if self.phase == CyclePhase::Idle {
            return CycleStep::finished(Vec::new());
        }

        let mut commands = Vec::new();
        let outcome = match reason {
            AbortReason::Cancelled => CycleOutcome::Cancelled,
            AbortReason::TimedOut => {
                commands.push(CycleCommand::Log(
                    MessageType::WARNING,
                    format!("test run for {} timed out; process killed", self.uri),
                ));
                CycleOutcome::TimedOut
            }
        };
        commands.push(CycleCommand::CloseProcess);
        self.finish(outcome);
        CycleStep::finished(commands)
    }

    /// Map each test file in order, publishing the accumulated set after
    /// every file.
    fn handle_results(&mut self, payload: &TestRunResults) -> CycleStep {
        let mut commands = Vec::new();

        for file in &payload.test_results {
            self.phase = CyclePhase::Publishing;
            self.diagnostics.extend(self.mapper.map_file(file));
            commands.push(CycleCommand::Publish(self.diagnostics.clone()));
        }

        commands.push(CycleCommand::CloseProcess);
        self.finish(CycleOutcome::Published {
            diagnostics: self.diagnostics.len(),
        });
        CycleStep::finished(commands)
    }

    fn finish(&mut self, outcome: CycleOutcome) {
        self.phase = CyclePhase::Idle;
        self.outcome = Some(outcome);
    }
}
