// src/engine/mod.rs

//! Validation orchestration engine.
//!
//! This module ties together:
//! - the run request gate
//! - one runner adapter per cycle
//! - the result-to-diagnostic mapper
//! - the outbound client sink
//!
//! The pure per-cycle state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]; [`orchestrator`] keys cycles by document.

/// Document lifecycle event that starts a validation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Opened,
    Changed,
    Saved,
}

pub mod core;
pub mod orchestrator;
pub mod runtime;
pub mod sink;

pub use self::core::{AbortReason, CycleCommand, CycleOutcome, CyclePhase, CycleStep, ValidationCycle};
pub use self::orchestrator::Orchestrator;
pub use self::runtime::{run_cycle, CancelSignal, ValidationContext};
pub use self::sink::{ClientSink, Publish, RecordingSink};
