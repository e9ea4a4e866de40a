// src/runner/process.rs

//! Real runner adapter backed by a child process.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{JestLspError, Result};
use crate::results::parse_payload;

use super::backend::RunnerAdapter;
use super::{LaunchSpec, RunnerEvent};

enum ProcessState {
    NotStarted,
    Running {
        cancel: Option<oneshot::Sender<()>>,
        handle: JoinHandle<()>,
    },
    Closed,
}

/// One runner process for one validation cycle.
///
/// `start` spawns the child on the current Tokio runtime and returns the
/// event stream. `close_process` (also run on drop) kills the child if it is
/// still running; events sent after that are discarded.
pub struct RunnerProcess {
    spec: LaunchSpec,
    state: ProcessState,
}

impl RunnerProcess {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            state: ProcessState::NotStarted,
        }
    }
}

impl RunnerAdapter for RunnerProcess {
    fn start(&mut self) -> Result<mpsc::Receiver<RunnerEvent>> {
        if !matches!(self.state, ProcessState::NotStarted) {
            return Err(JestLspError::RunnerAlreadyStarted(
                self.spec.target_path.display().to_string(),
            ));
        }

        let (events_tx, events_rx) = mpsc::channel::<RunnerEvent>(64);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let spec = self.spec.clone();

        let handle = tokio::spawn(async move {
            run_process(spec, events_tx, cancel_rx).await;
        });

        self.state = ProcessState::Running {
            cancel: Some(cancel_tx),
            handle,
        };
        Ok(events_rx)
    }

    fn close_process(&mut self) {
        match std::mem::replace(&mut self.state, ProcessState::Closed) {
            ProcessState::Running { cancel, handle } => {
                if handle.is_finished() {
                    debug!(target_path = %self.spec.target_path.display(), "runner already finished; nothing to kill");
                    return;
                }
                if let Some(cancel) = cancel {
                    if cancel.send(()).is_err() {
                        debug!(
                            target_path = %self.spec.target_path.display(),
                            "runner finished while closing"
                        );
                    }
                }
            }
            ProcessState::NotStarted | ProcessState::Closed => {}
        }
    }

    fn is_closed(&self) -> bool {
        matches!(self.state, ProcessState::Closed)
    }
}

impl Drop for RunnerProcess {
    fn drop(&mut self) {
        self.close_process();
    }
}

/// Drive one child process to completion (or cancellation), reporting its
/// lifecycle on `events`.
///
/// A cancelled process is killed and emits no further events.
async fn run_process(
    spec: LaunchSpec,
    events: mpsc::Sender<RunnerEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    info!(
        cmd = %spec.command_line(),
        cwd = %spec.working_directory.display(),
        "starting runner process"
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .arg(&spec.target_path)
        .current_dir(&spec.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(
                program = %spec.program.display(),
                error = %err,
                "failed to spawn runner process"
            );
            let reason = format!("failed to spawn '{}': {err}", spec.program.display());
            let _ = events.send(RunnerEvent::FatalLaunchError(reason)).await;
            return;
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Output is drained on separate tasks so a chatty runner can never block
    // on a full pipe while we wait for it to exit.
    let stdout_task = tokio::spawn(read_stdout(stdout));
    let stderr_task = tokio::spawn(forward_stderr(stderr, events.clone()));

    tokio::select! {
        terminal = wait_for_completion(&mut child, stdout_task, stderr_task, &events) => {
            let _ = events.send(terminal).await;
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(
                        target_path = %spec.target_path.display(),
                        "close requested for running runner; killing process"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(
                            target_path = %spec.target_path.display(),
                            error = %e,
                            "failed to kill runner process"
                        );
                    }
                }
                Err(e) => {
                    debug!(
                        target_path = %spec.target_path.display(),
                        error = %e,
                        "cancel channel closed without explicit close"
                    );
                    // Child will be killed on drop due to kill_on_drop(true).
                }
            }
        }
    }
}

async fn wait_for_completion(
    child: &mut Child,
    stdout_task: JoinHandle<String>,
    stderr_task: JoinHandle<usize>,
    events: &mpsc::Sender<RunnerEvent>,
) -> RunnerEvent {
    let status = match child.wait().await {
        Ok(status) => status,
        Err(err) => {
            return RunnerEvent::FatalLaunchError(format!("waiting for runner process: {err}"));
        }
    };

    let code = status.code().unwrap_or(-1);
    info!(exit_code = code, success = status.success(), "runner process exited");
    let _ = events.send(RunnerEvent::ProcessExited(code)).await;

    let output = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();
    let _ = events.send(RunnerEvent::ProcessClosed).await;

    match parse_payload(&output) {
        Some(payload) => RunnerEvent::ResultsReady(payload),
        None if output.trim().is_empty() && stderr_bytes == 0 && !status.success() => {
            RunnerEvent::FatalLaunchError(format!("runner exited with code {code} before producing output"))
        }
        None => {
            debug!(stdout_bytes = output.len(), stderr_bytes, "runner output is not a results payload");
            RunnerEvent::RawOutputComplete
        }
    }
}

async fn read_stdout(stdout: Option<ChildStdout>) -> String {
    let Some(mut stdout) = stdout else {
        return String::new();
    };

    let mut buf = Vec::new();
    if let Err(e) = stdout.read_to_end(&mut buf).await {
        warn!(error = %e, "failed to read runner stdout");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Forward stderr line by line; returns the number of bytes seen.
///
/// Lines are decoded lossily so the pipe keeps draining whatever the runner
/// writes.
async fn forward_stderr(stderr: Option<ChildStderr>, events: mpsc::Sender<RunnerEvent>) -> usize {
    let Some(stderr) = stderr else {
        return 0;
    };

    let mut total = 0;
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                debug!("stderr: {}", line);
                // A closed receiver just means nobody is listening any more.
                let _ = events.send(RunnerEvent::StderrChunk(line)).await;
            }
            Err(e) => {
                warn!(error = %e, "failed to read runner stderr");
                break;
            }
        }
    }
    total
}
