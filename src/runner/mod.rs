// src/runner/mod.rs

//! Runner process layer.
//!
//! One adapter owns one external test-runner process for one validation
//! cycle. It is never reused.
//!
//! - [`launch`] resolves the runner binary and builds the [`LaunchSpec`].
//! - [`process`] runs the child with `tokio::process::Command` and turns its
//!   lifecycle into [`RunnerEvent`]s.
//! - [`backend`] provides the [`RunnerAdapter`] / [`RunnerFactory`] seam so
//!   tests can substitute scripted runners for real processes.

pub mod backend;
pub mod launch;
pub mod process;

pub use backend::{ProcessRunnerFactory, RunnerAdapter, RunnerFactory};
pub use launch::{resolve_program, LaunchSpec};
pub use process::RunnerProcess;

use crate::results::TestRunResults;

/// Everything an adapter can report about its process.
///
/// `ResultsReady`, `RawOutputComplete` and `FatalLaunchError` are terminal:
/// at most one of them is emitted per run, and it is always the last event.
/// The adapter does not close itself on a terminal event; the consumer calls
/// [`RunnerAdapter::close_process`] once it is done with the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    /// The run finished and printed a well-formed results payload.
    ResultsReady(TestRunResults),
    /// The run finished but its output was not a results payload.
    RawOutputComplete,
    /// The process could not be started, or died before producing output.
    FatalLaunchError(String),
    /// One line of the process's stderr.
    StderrChunk(String),
    /// The process's output streams were closed.
    ProcessClosed,
    /// The process exited with this code (`-1` when killed by a signal).
    ProcessExited(i32),
}

impl RunnerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunnerEvent::ResultsReady(_)
                | RunnerEvent::RawOutputComplete
                | RunnerEvent::FatalLaunchError(_)
        )
    }

    /// Collapse a terminal event into its [`RunOutcome`].
    pub fn into_outcome(self) -> Option<RunOutcome> {
        match self {
            RunnerEvent::ResultsReady(payload) => Some(RunOutcome::Completed(payload)),
            RunnerEvent::RawOutputComplete => Some(RunOutcome::Unstructured),
            RunnerEvent::FatalLaunchError(reason) => Some(RunOutcome::LaunchFailed(reason)),
            _ => None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(TestRunResults),
    Unstructured,
    LaunchFailed(String),
}
