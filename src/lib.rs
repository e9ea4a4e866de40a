// src/lib.rs

pub mod check;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod gate;
pub mod logging;
pub mod lsp;
pub mod results;
pub mod runner;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::runner::ProcessRunnerFactory;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - either the one-shot `--check` / `--dry-run` modes
/// - or the stdio language server
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    if let Some(file) = args.check.as_deref() {
        let report =
            check::check_file(&cfg, file, Arc::new(ProcessRunnerFactory::new())).await?;
        info!(outcome = ?report.outcome, count = report.diagnostics.len(), "check complete");
        println!("{}", serde_json::to_string_pretty(&report.diagnostics)?);
        return Ok(());
    }

    lsp::run_stdio_server(cfg).await?;
    Ok(())
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("jest-lsp dry-run");
    println!("  runner.command = {}", cfg.runner.command);
    println!("  runner.args = {:?}", cfg.runner.args);
    if let Some(ref path) = cfg.runner.binary_override_path {
        println!("  runner.binary_override_path = {}", path.display());
    }
    println!("  runner.local_bin_dir = {}", cfg.runner.local_bin_dir.display());
    match cfg.run_timeout() {
        Some(t) => println!("  runner.timeout = {t:?}"),
        None => println!("  runner.timeout = none"),
    }
    println!("  gate.policy = {:?}", cfg.gate.policy);
    println!("  validation.overlap = {:?}", cfg.validation.overlap);
    println!("  validation.debounce = {:?}", cfg.debounce());
    println!("  diagnostics.source = {}", cfg.diagnostics.source);
    println!("  diagnostics.end_column = {}", cfg.diagnostics.end_column);
    println!("  diagnostics.separator = {:?}", cfg.diagnostics.separator);

    debug!("dry-run complete (no server started)");
}
