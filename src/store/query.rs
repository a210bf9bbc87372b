//! Query and aggregation types
//!
//! Filters are conjunctive; an absent filter is a no-op. Date ranges are
//! inclusive on both bounds. Queries never error: no matches is an empty vec.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Sort order applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first (default).
    #[default]
    CreatedDesc,
    CreatedAsc,
    UpdatedDesc,
}

/// A conjunctive filter over one store.
///
/// `group` constraints name declared grouping indexes; the query planner
/// seeds the candidate set from the smallest matching bucket and applies the
/// rest as predicates.
#[derive(Default)]
pub struct Query {
    pub group: Vec<(&'static str, String)>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn group(mut self, index: &'static str, key: impl Into<String>) -> Self {
        self.group.push((index, key.into()));
        self
    }

    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// On-demand aggregate view over one store. Always computed from live state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary<T> {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_group: BTreeMap<String, usize>,
    /// Top-N records by creation time, newest first.
    pub recent: Vec<T>,
}
