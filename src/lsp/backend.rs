// src/lsp/backend.rs

use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

use crate::engine::{DocumentEvent, Orchestrator};

/// Language server front end: forwards document lifecycle notifications to
/// the [`Orchestrator`]. Document contents are never inspected.
#[derive(Debug)]
pub struct Backend {
    client: Client,
    orchestrator: Orchestrator,
}

impl Backend {
    pub fn new(client: Client, orchestrator: Orchestrator) -> Self {
        Self {
            client,
            orchestrator,
        }
    }

    fn validate(&self, event: DocumentEvent, uri: Url) {
        // Cycles report through the client sink; the handle is not needed.
        drop(self.orchestrator.on_document_event(event, uri));
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        debug!(root_uri = ?params.root_uri, "initialize");

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("client initialized");
        self.client
            .log_message(MessageType::INFO, "jest-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        info!("shutdown requested; cancelling in-flight test runs");
        self.orchestrator.cancel_all();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.validate(DocumentEvent::Opened, params.text_document.uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.validate(DocumentEvent::Changed, params.text_document.uri);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.validate(DocumentEvent::Saved, params.text_document.uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.orchestrator.cancel(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        info!("configuration changed; settings are read from the config file at startup");
    }
}
