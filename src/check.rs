// src/check.rs

//! One-shot validation outside an editor (`--check <FILE>`).

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_lsp::lsp_types::Diagnostic;

use crate::config::ConfigFile;
use crate::document::DocumentIdentity;
use crate::engine::{run_cycle, CancelSignal, CycleOutcome, RecordingSink, ValidationContext};
use crate::runner::RunnerFactory;

/// Result of a one-shot check.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub outcome: CycleOutcome,
    /// The diagnostic set an editor would be showing after the cycle.
    pub diagnostics: Vec<Diagnostic>,
}

/// Run a single validation cycle for `path` and collect what was published.
pub async fn check_file(
    config: &ConfigFile,
    path: impl AsRef<Path>,
    factory: Arc<dyn RunnerFactory>,
) -> Result<CheckReport> {
    let path = path.as_ref();
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("resolving {}", path.display()))?;
    let doc = DocumentIdentity::from_path(&absolute)
        .with_context(|| format!("{} cannot be expressed as a file URI", absolute.display()))?;

    let sink = Arc::new(RecordingSink::new());
    let ctx = ValidationContext::new(config, factory, sink.clone())?;

    let outcome = run_cycle(Arc::new(ctx), doc.clone(), 0, CancelSignal::never()).await;
    let diagnostics = sink.current().remove(doc.uri()).unwrap_or_default();

    Ok(CheckReport {
        outcome,
        diagnostics,
    })
}
