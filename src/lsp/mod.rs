// src/lsp/mod.rs

//! Language-server transport, provided by `tower-lsp` over stdio.

pub mod backend;

use std::sync::Arc;

use tower_lsp::{LspService, Server};
use tracing::info;

use crate::config::ConfigFile;
use crate::engine::{Orchestrator, ValidationContext};
use crate::errors::Result;
use crate::gate::RunGate;
use crate::runner::ProcessRunnerFactory;

pub use backend::Backend;

/// Serve LSP on stdin/stdout until the client disconnects.
pub async fn run_stdio_server(config: ConfigFile) -> Result<()> {
    let gate = RunGate::new(config.gate.policy)?;
    let overlap = config.validation.overlap;

    let (service, socket) = LspService::new(move |client| {
        let ctx = ValidationContext::with_gate(
            &config,
            gate,
            Arc::new(ProcessRunnerFactory::new()),
            Arc::new(client.clone()),
        );
        Backend::new(client, Orchestrator::new(ctx, overlap))
    });

    info!("serving LSP on stdio");
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;

    Ok(())
}
