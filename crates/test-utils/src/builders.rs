#![allow(dead_code)]

use jest_lsp::config::{ConfigFile, RawConfigFile};
use jest_lsp::results::{
    AssertionResult, AssertionStatus, SourceLocation, TestFileResult, TestRunResults,
};
use jest_lsp::types::{GatePolicy, OverlapBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn gate_policy(mut self, policy: GatePolicy) -> Self {
        self.config.gate.policy = policy;
        self
    }

    pub fn overlap(mut self, overlap: OverlapBehaviour) -> Self {
        self.config.validation.overlap = overlap;
        self
    }

    pub fn debounce(mut self, duration: &str) -> Self {
        self.config.validation.debounce = duration.to_string();
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.config.runner.timeout = Some(duration.to_string());
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.config.runner.command = command.to_string();
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.config.runner.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn binary_override(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.runner.binary_override_path = Some(path.into());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.config.diagnostics.source = source.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a runner results payload.
#[derive(Default)]
pub struct ResultsBuilder {
    files: Vec<TestFileResult>,
}

impl ResultsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, assertions: Vec<AssertionResult>) -> Self {
        self.files.push(TestFileResult {
            name: name.to_string(),
            status: "failed".to_string(),
            assertion_results: assertions,
        });
        self
    }

    pub fn build(self) -> TestRunResults {
        let num_failed_tests = self
            .files
            .iter()
            .flat_map(|f| &f.assertion_results)
            .filter(|a| a.has_failures())
            .count() as u32;

        TestRunResults {
            success: num_failed_tests == 0,
            num_failed_tests,
            test_results: self.files,
        }
    }
}

/// A failing assertion at `line:column`.
pub fn failing(title: &str, messages: &[&str], line: u32, column: u32) -> AssertionResult {
    AssertionResult {
        status: AssertionStatus::Failed,
        title: title.to_string(),
        full_name: title.to_string(),
        failure_messages: messages.iter().map(|m| m.to_string()).collect(),
        location: Some(SourceLocation { line, column }),
    }
}

/// A failing assertion without a location.
pub fn failing_unlocated(title: &str, messages: &[&str]) -> AssertionResult {
    AssertionResult {
        location: None,
        ..failing(title, messages, 0, 0)
    }
}

/// A passing assertion.
pub fn passing(title: &str) -> AssertionResult {
    AssertionResult {
        status: AssertionStatus::Passed,
        title: title.to_string(),
        full_name: title.to_string(),
        failure_messages: Vec::new(),
        location: None,
    }
}
