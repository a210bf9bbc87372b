//! Application state management
//!
//! Contains shared state accessible across all handlers: one store per
//! entity kind plus the mirror backends. Stores are constructed here (not as
//! module globals) so tests get a fresh, isolated state per instance.

use crate::boarding::{ComplianceStore, DocumentStore, ExceptionStore, LoanStore};
use crate::commitment::CommitmentStore;
use crate::config::Settings;
use crate::mirror::{Mirror, MirrorHub, RelationshipGraph, SearchIndexMirror};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub loans: LoanStore,
    pub documents: DocumentStore,
    pub exceptions: ExceptionStore,
    pub compliance: ComplianceStore,
    pub commitments: CommitmentStore,

    /// Search mirror, kept for the search route. Never consulted by the
    /// store query paths.
    pub search: Option<Arc<SearchIndexMirror>>,
    /// Relationship graph mirror (write-only log).
    pub graph: Option<Arc<RelationshipGraph>>,
}

impl AppState {
    /// Wire up stores and mirror propagation per the settings. Must be
    /// called from within a tokio runtime (the mirror worker is spawned).
    pub fn new(settings: &Settings) -> Self {
        let search = settings
            .mirrors
            .search_enabled
            .then(|| Arc::new(SearchIndexMirror::new()));
        let graph = settings
            .mirrors
            .graph_enabled
            .then(|| Arc::new(RelationshipGraph::new()));

        let mut mirrors: Vec<Arc<dyn Mirror>> = Vec::new();
        if let Some(s) = &search {
            mirrors.push(s.clone());
        }
        if let Some(g) = &graph {
            mirrors.push(g.clone());
        }
        let sender = if mirrors.is_empty() {
            None
        } else {
            Some(MirrorHub::start(mirrors).sender())
        };

        let policy = settings.store.duplicate_key_policy;
        let recent = settings.store.recent_limit;

        Self {
            loans: LoanStore::new(policy, recent, sender.clone()),
            documents: DocumentStore::new(recent, sender.clone()),
            exceptions: ExceptionStore::new(recent, sender.clone()),
            compliance: ComplianceStore::new(recent, sender.clone()),
            commitments: CommitmentStore::new(policy, recent, sender),
            search,
            graph,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
