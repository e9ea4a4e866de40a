// src/runner/launch.rs

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::RunnerSection;
use crate::document::DocumentIdentity;
use crate::fs::FileSystem;

/// Fully resolved description of one runner invocation.
///
/// Built once per cycle from `[runner]` and the document identity:
/// `<program> <args...> <target_path>`, launched in `working_directory`.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Command name as configured (e.g. `"jest"`).
    pub command: String,
    /// Executable actually spawned.
    pub program: PathBuf,
    pub args: Vec<String>,
    pub target_path: PathBuf,
    pub working_directory: PathBuf,
    pub binary_override_path: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn resolve(runner: &RunnerSection, doc: &DocumentIdentity, fs: &dyn FileSystem) -> Self {
        let program = resolve_program(
            &runner.command,
            runner.binary_override_path.as_deref(),
            &runner.local_bin_dir,
            doc.working_dir(),
            fs,
        );

        Self {
            command: runner.command.clone(),
            program,
            args: runner.args.clone(),
            target_path: doc.path().to_path_buf(),
            working_directory: doc.working_dir().to_path_buf(),
            binary_override_path: runner.binary_override_path.clone(),
        }
    }

    /// Human-readable command line, for logs only.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.push(self.target_path.display().to_string());
        parts.join(" ")
    }
}

impl fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("command_line", &self.command_line())
            .field("working_directory", &self.working_directory)
            .finish_non_exhaustive()
    }
}

/// Pick the executable for `command`.
///
/// 1. `override_path`, when configured.
/// 2. `<ancestor>/<local_bin_dir>/<command>` for the nearest ancestor of
///    `working_dir` that has one (project-local install).
/// 3. `command` itself, left for `PATH` lookup (global install).
pub fn resolve_program(
    command: &str,
    override_path: Option<&Path>,
    local_bin_dir: &Path,
    working_dir: &Path,
    fs: &dyn FileSystem,
) -> PathBuf {
    if let Some(path) = override_path {
        debug!(program = %path.display(), "using runner binary override");
        return path.to_path_buf();
    }

    for dir in working_dir.ancestors() {
        let bin_dir = dir.join(local_bin_dir);
        for name in local_binary_names(command) {
            let candidate = bin_dir.join(&name);
            if fs.is_file(&candidate) {
                debug!(program = %candidate.display(), "using project-local runner binary");
                return candidate;
            }
        }
    }

    debug!(command, "no project-local runner found; relying on PATH");
    PathBuf::from(command)
}

fn local_binary_names(command: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{command}.cmd"), command.to_string()]
    } else {
        vec![command.to_string()]
    }
}
