// src/engine/orchestrator.rs

//! Top-level entry point for document events.
//!
//! Each document event spawns one validation cycle on Tokio. Active cycles
//! are tracked per URI so that, with [`OverlapBehaviour::Cancel`], there is
//! never more than one authoritative cycle per document: starting a new one
//! tears down the runner of the previous one before it can publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info};

use crate::document::DocumentIdentity;
use crate::types::OverlapBehaviour;

use super::core::CycleOutcome;
use super::runtime::{run_cycle, CancelSignal, ValidationContext};
use super::DocumentEvent;

/// Handle for one in-flight cycle.
#[derive(Debug)]
struct ActiveCycle {
    id: u64,
    cancel: Option<oneshot::Sender<()>>,
}

type ActiveMap = HashMap<Url, Vec<ActiveCycle>>;

#[derive(Debug)]
pub struct Orchestrator {
    ctx: Arc<ValidationContext>,
    overlap: OverlapBehaviour,
    active: Arc<Mutex<ActiveMap>>,
    next_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(ctx: ValidationContext, overlap: OverlapBehaviour) -> Self {
        Self {
            ctx: Arc::new(ctx),
            overlap,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// React to a document lifecycle event by starting a new cycle.
    ///
    /// The returned handle resolves when the cycle ends; callers that only
    /// fire and forget may drop it.
    pub fn on_document_event(&self, event: DocumentEvent, uri: Url) -> JoinHandle<CycleOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let doc = DocumentIdentity::from_uri(uri.clone());
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        debug!(%uri, ?event, cycle_id = id, "document event");

        // Register before spawning so a cycle that finishes immediately
        // always finds its own entry to remove.
        {
            let mut active = lock(&self.active);
            let cycles = active.entry(uri.clone()).or_default();
            if self.overlap == OverlapBehaviour::Cancel {
                for previous in cycles.drain(..) {
                    cancel_cycle(&uri, previous);
                }
            }
            cycles.push(ActiveCycle {
                id,
                cancel: Some(cancel_tx),
            });
        }

        let ctx = Arc::clone(&self.ctx);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            let outcome = run_cycle(ctx, doc, id, CancelSignal::new(cancel_rx)).await;
            forget_cycle(&active, &uri, id);
            outcome
        })
    }

    /// Cancel every in-flight cycle for `uri` without publishing.
    pub fn cancel(&self, uri: &Url) {
        let cycles = lock(&self.active).remove(uri).unwrap_or_default();
        for cycle in cycles {
            cancel_cycle(uri, cycle);
        }
    }

    /// Cancel every in-flight cycle.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = lock(&self.active).drain().collect();
        for (uri, cycles) in drained {
            for cycle in cycles {
                cancel_cycle(&uri, cycle);
            }
        }
    }

    /// Number of in-flight cycles for `uri`.
    pub fn active_cycles(&self, uri: &Url) -> usize {
        lock(&self.active).get(uri).map_or(0, Vec::len)
    }
}

fn lock(active: &Mutex<ActiveMap>) -> std::sync::MutexGuard<'_, ActiveMap> {
    // Entries are only inserted or removed whole, so a poisoned map is
    // still consistent.
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn cancel_cycle(uri: &Url, mut cycle: ActiveCycle) {
    info!(%uri, cycle_id = cycle.id, "cancelling superseded validation cycle");
    if let Some(cancel) = cycle.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(%uri, cycle_id = cycle.id, "cycle already finished while cancelling");
        }
    }
}

fn forget_cycle(active: &Mutex<ActiveMap>, uri: &Url, id: u64) {
    let mut active = lock(active);
    if let Some(cycles) = active.get_mut(uri) {
        cycles.retain(|c| c.id != id);
        if cycles.is_empty() {
            active.remove(uri);
        }
    }
}
