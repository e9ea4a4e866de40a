// src/gate.rs

//! Run request gate: decides whether a document is a test file.
//!
//! Classification only looks at the URI string. Non-candidates never spawn a
//! runner; running "related tests" for them is not supported.

use regex::Regex;

use crate::errors::Result;
use crate::types::GatePolicy;

/// Script extensions recognised by the strict policy.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

const BROAD_PATTERN: &str = r"\.spec\.|\.test\.g";

/// Compiled classifier for one [`GatePolicy`].
#[derive(Debug, Clone)]
pub struct RunGate {
    policy: GatePolicy,
    pattern: Regex,
}

impl RunGate {
    pub fn new(policy: GatePolicy) -> Result<Self> {
        let pattern = match policy {
            GatePolicy::Broad => Regex::new(BROAD_PATTERN)?,
            GatePolicy::Strict => Regex::new(&strict_pattern())?,
        };
        Ok(Self { policy, pattern })
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Returns true if a test run should be triggered for `uri`.
    pub fn classify(&self, uri: &str) -> bool {
        self.pattern.is_match(uri)
    }
}

fn strict_pattern() -> String {
    format!(r"\.(?:spec|test)\.(?:{})$", SCRIPT_EXTENSIONS.join("|"))
}
