// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jest-lsp`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jest-lsp",
    version,
    about = "Language server that runs tests on edit and reports failing assertions as diagnostics.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `jest-lsp.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "jest-lsp.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JEST_LSP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Validate a single file once, print its diagnostics as JSON and exit
    /// instead of serving LSP.
    #[arg(long, value_name = "FILE")]
    pub check: Option<String>,

    /// Accepted for editor clients that always pass it; stdio is the only
    /// transport.
    #[arg(long, hide = true)]
    pub stdio: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
