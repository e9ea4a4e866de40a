// src/results.rs

//! Structured results payload emitted by the runner (`jest --json`).
//!
//! Only the fields the diagnostics pipeline needs are modelled; everything
//! else in the runner's JSON document is ignored.

use serde::Deserialize;

/// Whole-run payload. `testResults` is required: a JSON document without it
/// is not a results payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResults {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub num_failed_tests: u32,
    pub test_results: Vec<TestFileResult>,
}

/// Results for one test file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFileResult {
    /// Absolute path of the test file.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assertion_results: Vec<AssertionResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    #[serde(default)]
    pub status: AssertionStatus,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub failure_messages: Vec<String>,
    /// Only reported with `--testLocationInResults`; may be `null`.
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl AssertionResult {
    pub fn has_failures(&self) -> bool {
        !self.failure_messages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
    Todo,
    Disabled,
    Focused,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Try to extract a results payload from the runner's stdout.
///
/// The runner normally prints exactly one JSON document, but setup code may
/// print before it. If the whole output does not parse, the last line that
/// looks like a JSON object is tried instead. Returns `None` for anything
/// that is not a results payload.
pub fn parse_payload(output: &str) -> Option<TestRunResults> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(results) = serde_json::from_str::<TestRunResults>(trimmed) {
        return Some(results);
    }

    trimmed
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<TestRunResults>(line).ok())
}
