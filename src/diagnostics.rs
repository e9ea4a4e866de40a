// src/diagnostics.rs

//! Result-to-diagnostic mapping.
//!
//! Every assertion with at least one failure message becomes exactly one
//! error diagnostic. The runner reports no end position, so each range
//! spans from the reported location to a fixed wide column on the same line,
//! never ending before it starts.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};
use tracing::warn;

use crate::config::DiagnosticsSection;
use crate::results::{AssertionResult, TestFileResult, TestRunResults};

/// Appended to the message of a diagnostic whose assertion had no location.
pub const MISSING_LOCATION_NOTE: &str = "(test runner reported no source location)";

#[derive(Debug, Clone)]
pub struct DiagnosticMapper {
    source: String,
    end_column: u32,
    separator: String,
}

impl DiagnosticMapper {
    pub fn new(section: &DiagnosticsSection) -> Self {
        Self {
            source: section.source.clone(),
            end_column: section.end_column,
            separator: section.separator.clone(),
        }
    }

    /// Diagnostics for one test file, in assertion order.
    pub fn map_file(&self, file: &TestFileResult) -> Vec<Diagnostic> {
        file.assertion_results
            .iter()
            .filter(|a| a.has_failures())
            .map(|a| self.map_assertion(a))
            .collect()
    }

    /// Diagnostics for a whole payload, files in order.
    pub fn map(&self, payload: &TestRunResults) -> Vec<Diagnostic> {
        payload
            .test_results
            .iter()
            .flat_map(|file| self.map_file(file))
            .collect()
    }

    fn map_assertion(&self, assertion: &AssertionResult) -> Diagnostic {
        let mut message = assertion.failure_messages.join(&self.separator);

        let (line, column) = match assertion.location {
            Some(loc) => (loc.line, loc.column),
            None => {
                warn!(
                    test = %assertion.full_name,
                    "failing assertion has no location; placing diagnostic at 0:0"
                );
                message.push('\n');
                message.push_str(MISSING_LOCATION_NOTE);
                (0, 0)
            }
        };

        Diagnostic {
            range: Range {
                start: Position {
                    line,
                    character: column,
                },
                end: Position {
                    line,
                    character: self.end_column.max(column),
                },
            },
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(self.source.clone()),
            message,
            ..Diagnostic::default()
        }
    }
}

impl Default for DiagnosticMapper {
    fn default() -> Self {
        Self::new(&DiagnosticsSection::default())
    }
}
