// src/engine/runtime.rs

//! Async IO shell around [`ValidationCycle`].
//!
//! The shell reads runner events, feeds them into the pure core and executes
//! the commands it gets back. It also owns everything time-related:
//! debouncing, cancellation by a newer cycle, and the run timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{sleep, sleep_until, Instant};
use tower_lsp::lsp_types::MessageType;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, RunnerSection};
use crate::diagnostics::DiagnosticMapper;
use crate::document::DocumentIdentity;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::gate::RunGate;
use crate::runner::{LaunchSpec, RunnerAdapter, RunnerEvent, RunnerFactory};

use super::core::{AbortReason, CycleCommand, CycleOutcome, ValidationCycle};
use super::sink::ClientSink;

/// Everything a cycle needs, shared by all cycles.
pub struct ValidationContext {
    pub gate: RunGate,
    pub mapper: DiagnosticMapper,
    pub runner: RunnerSection,
    pub debounce: Duration,
    pub timeout: Option<Duration>,
    pub factory: Arc<dyn RunnerFactory>,
    pub sink: Arc<dyn ClientSink>,
    pub fs: Arc<dyn FileSystem>,
    /// Serialises publishes so a superseded cycle cannot land after the
    /// clear of the cycle that replaced it.
    publish_lock: Mutex<()>,
}

impl ValidationContext {
    pub fn new(
        config: &ConfigFile,
        factory: Arc<dyn RunnerFactory>,
        sink: Arc<dyn ClientSink>,
    ) -> Result<Self> {
        let gate = RunGate::new(config.gate.policy)?;
        Ok(Self::with_gate(config, gate, factory, sink))
    }

    /// Like [`ValidationContext::new`] with an already compiled gate.
    pub fn with_gate(
        config: &ConfigFile,
        gate: RunGate,
        factory: Arc<dyn RunnerFactory>,
        sink: Arc<dyn ClientSink>,
    ) -> Self {
        Self {
            gate,
            mapper: DiagnosticMapper::new(&config.diagnostics),
            runner: config.runner.clone(),
            debounce: config.debounce(),
            timeout: config.run_timeout(),
            factory,
            sink,
            fs: Arc::new(RealFileSystem),
            publish_lock: Mutex::new(()),
        }
    }

    /// Swap the filesystem used for runner binary resolution.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("gate", &self.gate)
            .field("debounce", &self.debounce)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Cancellation signal for one cycle.
///
/// Only an explicit send cancels. A dropped sender just means nobody can
/// cancel this cycle any more, so waiting continues forever.
pub struct CancelSignal {
    rx: Option<oneshot::Receiver<()>>,
    fired: bool,
}

impl CancelSignal {
    pub fn new(rx: oneshot::Receiver<()>) -> Self {
        Self {
            rx: Some(rx),
            fired: false,
        }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            rx: None,
            fired: false,
        }
    }

    /// Non-blocking check; once true, stays true.
    fn is_cancelled(&mut self) -> bool {
        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(()) => {
                    self.fired = true;
                    self.rx = None;
                }
                Err(oneshot::error::TryRecvError::Closed) => self.rx = None,
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
        }
        self.fired
    }

    async fn cancelled(&mut self) {
        if self.fired {
            return;
        }
        if let Some(rx) = self.rx.as_mut() {
            let result = rx.await;
            self.rx = None;
            if result.is_ok() {
                self.fired = true;
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Run one validation cycle for `doc` to completion.
pub async fn run_cycle(
    ctx: Arc<ValidationContext>,
    doc: DocumentIdentity,
    cycle_id: u64,
    mut cancel: CancelSignal,
) -> CycleOutcome {
    let uri = doc.uri().clone();
    let is_candidate = ctx.gate.classify(uri.as_str());
    debug!(%uri, cycle_id, is_candidate, "validation cycle starting");

    if is_candidate && !ctx.debounce.is_zero() {
        tokio::select! {
            _ = sleep(ctx.debounce) => {}
            _ = cancel.cancelled() => {
                debug!(%uri, cycle_id, "cycle superseded during debounce");
                return CycleOutcome::Cancelled;
            }
        }
    }

    let mut shell = CycleShell {
        ctx,
        doc,
        cycle_id,
        adapter: None,
        events: None,
        deadline: None,
        superseded: false,
    };
    let mut cycle = ValidationCycle::new(uri.clone(), shell.ctx.mapper.clone());
    let mut step = cycle.begin(is_candidate);

    loop {
        let keep_running = step.keep_running;
        let mut follow_up = None;

        for command in step.commands {
            if let Some(event) = shell.execute(command, &mut cancel).await {
                follow_up = Some(event);
            }
            if shell.superseded {
                break;
            }
        }

        if shell.superseded {
            info!(%uri, cycle_id, "cycle superseded while publishing; dropping its diagnostics");
            shell.close_runner();
            break;
        }

        if let Some(event) = follow_up {
            step = cycle.step(event);
            continue;
        }

        if !keep_running {
            break;
        }

        let deadline = shell.deadline;
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => Input::Abort(AbortReason::Cancelled),
            _ = until(deadline) => Input::Abort(AbortReason::TimedOut),
            event = shell.next_event() => Input::Event(event),
        };

        step = match next {
            Input::Event(event) => cycle.step(event),
            Input::Abort(reason) => {
                info!(%uri, cycle_id, ?reason, "aborting validation cycle");
                cycle.abort(reason)
            }
        };
    }

    let outcome = if shell.superseded {
        CycleOutcome::Cancelled
    } else {
        cycle.outcome().unwrap_or(CycleOutcome::Unstructured)
    };
    debug!(%uri, cycle_id, ?outcome, "validation cycle finished");
    outcome
}

enum Input {
    Event(RunnerEvent),
    Abort(AbortReason),
}

struct CycleShell {
    ctx: Arc<ValidationContext>,
    doc: DocumentIdentity,
    cycle_id: u64,
    adapter: Option<Box<dyn RunnerAdapter>>,
    events: Option<mpsc::Receiver<RunnerEvent>>,
    deadline: Option<Instant>,
    /// Set when a publish found the cycle already cancelled.
    superseded: bool,
}

impl CycleShell {
    /// Execute one command. A runner that cannot be started is reported back
    /// as a synthetic event so the core decides what happens next.
    async fn execute(
        &mut self,
        command: CycleCommand,
        cancel: &mut CancelSignal,
    ) -> Option<RunnerEvent> {
        match command {
            CycleCommand::Publish(diagnostics) => {
                let _publishing = self.ctx.publish_lock.lock().await;
                if cancel.is_cancelled() {
                    debug!(
                        uri = %self.doc.uri(),
                        cycle_id = self.cycle_id,
                        "dropping publish of cancelled cycle"
                    );
                    self.superseded = true;
                    return None;
                }
                debug!(
                    uri = %self.doc.uri(),
                    cycle_id = self.cycle_id,
                    count = diagnostics.len(),
                    "publishing diagnostics"
                );
                self.ctx
                    .sink
                    .publish_diagnostics(self.doc.uri().clone(), diagnostics)
                    .await;
                None
            }
            CycleCommand::StartRunner => self.start_runner(),
            CycleCommand::CloseProcess => {
                self.close_runner();
                None
            }
            CycleCommand::Log(level, message) => {
                if level == MessageType::ERROR {
                    error!(cycle_id = self.cycle_id, "{message}");
                } else if level == MessageType::WARNING {
                    warn!(cycle_id = self.cycle_id, "{message}");
                } else {
                    info!(cycle_id = self.cycle_id, "{message}");
                }
                self.ctx.sink.log_message(level, message).await;
                None
            }
        }
    }

    fn start_runner(&mut self) -> Option<RunnerEvent> {
        let spec = LaunchSpec::resolve(&self.ctx.runner, &self.doc, self.ctx.fs.as_ref());
        info!(
            uri = %self.doc.uri(),
            cycle_id = self.cycle_id,
            cmd = %spec.command_line(),
            "starting test run"
        );

        let mut adapter = self.ctx.factory.create(spec);
        let started = adapter.start();
        self.adapter = Some(adapter);

        match started {
            Ok(events) => {
                self.events = Some(events);
                self.deadline = self
                    .ctx
                    .timeout
                    .and_then(|t| Instant::now().checked_add(t));
                None
            }
            Err(err) => Some(RunnerEvent::FatalLaunchError(err.to_string())),
        }
    }

    fn close_runner(&mut self) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.close_process();
        }
        self.events = None;
    }

    async fn next_event(&mut self) -> RunnerEvent {
        let Some(events) = self.events.as_mut() else {
            return std::future::pending().await;
        };

        match events.recv().await {
            Some(event) => event,
            None => {
                debug!(
                    uri = %self.doc.uri(),
                    cycle_id = self.cycle_id,
                    "runner event stream ended without a terminal event"
                );
                self.events = None;
                RunnerEvent::RawOutputComplete
            }
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
