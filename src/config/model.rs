// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{GatePolicy, OverlapBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// command = "jest"
/// args = ["--json", "--testLocationInResults"]
/// timeout = "120s"
///
/// [gate]
/// policy = "strict"
///
/// [validation]
/// overlap = "cancel"
/// debounce = "150ms"
///
/// [diagnostics]
/// source = "jest"
/// end_column = 100
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub gate: GateSection,

    #[serde(default)]
    pub validation: ValidationSection,

    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

/// `[runner]` section: how the external test runner is launched.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Runner executable name, e.g. `"jest"`.
    ///
    /// Resolved against `local_bin_dir` first, then `PATH`.
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the target path.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Explicit runner binary; skips local/global resolution entirely.
    #[serde(default)]
    pub binary_override_path: Option<PathBuf>,

    /// Project-local binary directory, relative to each ancestor of the
    /// target's working directory.
    #[serde(default = "default_local_bin_dir")]
    pub local_bin_dir: PathBuf,

    /// Upper bound on a single run (e.g. `"120s"`). No bound when absent.
    #[serde(default)]
    pub timeout: Option<String>,
}

fn default_command() -> String {
    "jest".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--json".to_string(), "--testLocationInResults".to_string()]
}

fn default_local_bin_dir() -> PathBuf {
    PathBuf::from("node_modules").join(".bin")
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            binary_override_path: None,
            local_bin_dir: default_local_bin_dir(),
            timeout: None,
        }
    }
}

/// `[gate]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateSection {
    #[serde(default)]
    pub policy: GatePolicy,
}

/// `[validation]` section: reaction policy for document events.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSection {
    #[serde(default)]
    pub overlap: OverlapBehaviour,

    /// Delay before a cycle starts its runner (e.g. `"200ms"`).
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

fn default_debounce() -> String {
    "0ms".to_string()
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            overlap: OverlapBehaviour::default(),
            debounce: default_debounce(),
        }
    }
}

/// `[diagnostics]` section: shape of published diagnostics.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsSection {
    #[serde(default = "default_source")]
    pub source: String,

    /// End column of every diagnostic range; wide enough to cover the line.
    #[serde(default = "default_end_column")]
    pub end_column: u32,

    /// Joins the failure messages of one assertion.
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_source() -> String {
    "jest".to_string()
}

fn default_end_column() -> u32 {
    100
}

fn default_separator() -> String {
    ",".to_string()
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            end_column: default_end_column(),
            separator: default_separator(),
        }
    }
}

/// Validated configuration used by the rest of the crate.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// durations are already parsed and the runner command is non-empty.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub gate: GateSection,
    pub validation: ValidationSection,
    pub diagnostics: DiagnosticsSection,
    timeout: Option<Duration>,
    debounce: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        timeout: Option<Duration>,
        debounce: Duration,
    ) -> Self {
        Self {
            runner: raw.runner,
            gate: raw.gate,
            validation: raw.validation,
            diagnostics: raw.diagnostics,
            timeout,
            debounce,
        }
    }

    /// Parsed `[runner].timeout`.
    pub fn run_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Parsed `[validation].debounce`.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default(), None, Duration::ZERO)
    }
}
