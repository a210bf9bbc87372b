//! Full-text search route
//!
//! Served entirely from the search mirror. When the mirror is disabled the
//! endpoint degrades to an empty result rather than failing: primary data is
//! unaffected and still reachable through the store query routes.

use crate::mirror::SearchHit;
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    /// True when the search mirror is disabled and results are unavailable.
    pub degraded: bool,
    pub hits: Vec<SearchHit>,
}

pub async fn search(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    match &state.search {
        Some(mirror) => Json(SearchResponse {
            success: true,
            degraded: false,
            hits: mirror.search(&query.q),
        }),
        None => Json(SearchResponse {
            success: true,
            degraded: true,
            hits: Vec::new(),
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatsResponse {
    pub success: bool,
    pub search_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_docs: Option<usize>,
    pub graph_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_edges: Option<usize>,
}

/// Sizes of the mirror backends. Counts may trail the stores since
/// propagation is asynchronous.
pub async fn mirror_stats(State(state): State<SharedState>) -> Json<MirrorStatsResponse> {
    Json(MirrorStatsResponse {
        success: true,
        search_enabled: state.search.is_some(),
        search_docs: state.search.as_ref().map(|s| s.doc_count()),
        graph_enabled: state.graph.is_some(),
        graph_edges: state.graph.as_ref().map(|g| g.edge_count()),
    })
}
