// src/runner/backend.rs

//! Pluggable runner abstraction.
//!
//! The orchestrator never spawns processes directly: it asks a
//! [`RunnerFactory`] for a fresh [`RunnerAdapter`] per cycle. Production code
//! uses [`ProcessRunnerFactory`]; tests provide factories whose adapters
//! replay scripted event sequences.

use std::fmt;

use tokio::sync::mpsc;

use crate::errors::Result;

use super::{LaunchSpec, RunnerEvent, RunnerProcess};

/// One runner invocation.
pub trait RunnerAdapter: Send {
    /// Start the run and return its event stream.
    ///
    /// Must be called at most once; a second call is an error.
    fn start(&mut self) -> Result<mpsc::Receiver<RunnerEvent>>;

    /// Release the process and stop delivering events. Idempotent.
    fn close_process(&mut self);

    fn is_closed(&self) -> bool;
}

/// Creates one adapter per validation cycle.
pub trait RunnerFactory: Send + Sync + fmt::Debug {
    fn create(&self, spec: LaunchSpec) -> Box<dyn RunnerAdapter>;
}

/// Factory for real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunnerFactory;

impl ProcessRunnerFactory {
    pub fn new() -> Self {
        Self
    }
}

impl RunnerFactory for ProcessRunnerFactory {
    fn create(&self, spec: LaunchSpec) -> Box<dyn RunnerAdapter> {
        Box::new(RunnerProcess::new(spec))
    }
}
