//! Mirror propagation
//!
//! Stores publish change events to external, non-authoritative mirrors (a
//! full-text search index and a relationship graph). Events are dispatched
//! over an unbounded channel after the store lock is released and applied by
//! a background task, so a slow or down mirror never blocks a store mutation.
//! A failed push is logged and dropped; mirrors are never read by the query
//! path.

mod graph;
mod search;

pub use graph::RelationshipGraph;
pub use search::{SearchHit, SearchIndexMirror};

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Failure of a mirror backend. Absorbed by the propagator, never surfaced
/// to the caller of a store mutation.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("mirror backend unavailable: {0}")]
    Unavailable(String),
}

/// A change to replicate into the mirrors.
#[derive(Debug, Clone)]
pub enum MirrorEvent {
    Upserted {
        kind: &'static str,
        id: Uuid,
        doc: Value,
    },
    Deleted {
        kind: &'static str,
        id: Uuid,
    },
}

pub type MirrorSender = mpsc::UnboundedSender<MirrorEvent>;

/// A mirror backend. Implementations own their I/O and synchronization; the
/// propagator only sequences events through them.
pub trait Mirror: Send + Sync {
    fn name(&self) -> &'static str;
    fn upsert(&self, kind: &str, id: Uuid, doc: &Value) -> Result<(), MirrorError>;
    fn remove(&self, kind: &str, id: Uuid) -> Result<(), MirrorError>;
}

/// Owns the event channel and the background worker applying events to each
/// configured mirror.
pub struct MirrorHub {
    tx: MirrorSender,
}

impl MirrorHub {
    /// Start the propagation worker over the given mirrors.
    pub fn start(mirrors: Vec<Arc<dyn Mirror>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<MirrorEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for mirror in &mirrors {
                    apply(mirror.as_ref(), &event);
                }
            }
            debug!("mirror propagation worker stopped");
        });
        Self { tx }
    }

    /// Sender handed to each store for fire-and-forget dispatch.
    pub fn sender(&self) -> MirrorSender {
        self.tx.clone()
    }
}

/// Apply one event to one mirror. No retries: a failure is logged and the
/// event is dropped for that mirror so later events keep flowing.
fn apply(mirror: &dyn Mirror, event: &MirrorEvent) {
    let result = match event {
        MirrorEvent::Upserted { kind, id, doc } => mirror.upsert(kind, *id, doc),
        MirrorEvent::Deleted { kind, id } => mirror.remove(kind, *id),
    };
    if let Err(e) = result {
        let (kind, id) = match event {
            MirrorEvent::Upserted { kind, id, .. } | MirrorEvent::Deleted { kind, id } => {
                (*kind, *id)
            }
        };
        warn!(
            mirror = mirror.name(),
            kind, %id, error = %e,
            "mirror update failed, dropping event"
        );
    }
}
