// src/engine/sink.rs

//! Outbound side of the validation pipeline.
//!
//! The orchestrator only ever talks to a [`ClientSink`]: diagnostics are
//! published through it and operator-visible log lines are reported through
//! it. In the language server this is the `tower_lsp::Client`; the
//! `--check` mode and tests use [`RecordingSink`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tower_lsp::Client;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

#[async_trait]
pub trait ClientSink: Send + Sync {
    /// Replace the complete diagnostic set for `uri`.
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>);

    /// Report a line the operator should see.
    async fn log_message(&self, level: MessageType, message: String);
}

#[async_trait]
impl ClientSink for Client {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        Client::publish_diagnostics(self, uri, diagnostics, None).await;
    }

    async fn log_message(&self, level: MessageType, message: String) {
        Client::log_message(self, level, message).await;
    }
}

/// One recorded `publish_diagnostics` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sink that keeps every publish and log line in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    publishes: Mutex<Vec<Publish>>,
    logs: Mutex<Vec<(MessageType, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish so far, in call order.
    pub fn publishes(&self) -> Vec<Publish> {
        self.publishes.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Publishes for a single document, in call order.
    pub fn publishes_for(&self, uri: &Url) -> Vec<Vec<Diagnostic>> {
        self.publishes()
            .into_iter()
            .filter(|p| &p.uri == uri)
            .map(|p| p.diagnostics)
            .collect()
    }

    /// The live diagnostic set per document: the last publish wins.
    pub fn current(&self) -> HashMap<Url, Vec<Diagnostic>> {
        let mut current = HashMap::new();
        for publish in self.publishes() {
            current.insert(publish.uri, publish.diagnostics);
        }
        current
    }

    pub fn logs(&self) -> Vec<(MessageType, String)> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        if let Ok(mut publishes) = self.publishes.lock() {
            publishes.push(Publish { uri, diagnostics });
        }
    }

    async fn log_message(&self, level: MessageType, message: String) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push((level, message));
        }
    }
}
