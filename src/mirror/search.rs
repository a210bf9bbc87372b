//! Full-text search mirror
//!
//! An in-process inverted index over the string fields of projected record
//! documents. Non-authoritative: it is rebuilt implicitly by the event stream
//! and may lag or lose entries without affecting primary results.

use super::{Mirror, MirrorError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// A search hit: the record kind and id that matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub kind: String,
    pub id: Uuid,
}

#[derive(Default)]
struct SearchState {
    /// term -> set of (kind, id)
    terms: HashMap<String, HashSet<(String, Uuid)>>,
    /// (kind, id) -> terms currently indexed for it
    docs: HashMap<(String, Uuid), HashSet<String>>,
}

/// In-process search index mirror.
#[derive(Default)]
pub struct SearchIndexMirror {
    state: Mutex<SearchState>,
}

impl SearchIndexMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive term lookup. Multi-word queries intersect.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut hits: Option<HashSet<(String, Uuid)>> = None;
        for term in tokenize_query(query) {
            let matched = state.terms.get(&term).cloned().unwrap_or_default();
            hits = Some(match hits {
                None => matched,
                Some(acc) => acc.intersection(&matched).cloned().collect(),
            });
        }
        let mut out: Vec<SearchHit> = hits
            .unwrap_or_default()
            .into_iter()
            .map(|(kind, id)| SearchHit { kind, id })
            .collect();
        out.sort_by(|a, b| (&a.kind, a.id).cmp(&(&b.kind, b.id)));
        out
    }

    /// Number of documents currently indexed.
    pub fn doc_count(&self) -> usize {
        let state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.docs.len()
    }
}

impl Mirror for SearchIndexMirror {
    fn name(&self) -> &'static str {
        "search"
    }

    fn upsert(&self, kind: &str, id: Uuid, doc: &Value) -> Result<(), MirrorError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MirrorError::Unavailable("search index poisoned".to_string()))?;
        let key = (kind.to_string(), id);

        // Drop the previous terms for this doc before re-indexing.
        if let Some(old_terms) = state.docs.remove(&key) {
            for term in old_terms {
                if let Some(set) = state.terms.get_mut(&term) {
                    set.remove(&key);
                    if set.is_empty() {
                        state.terms.remove(&term);
                    }
                }
            }
        }

        let mut terms = HashSet::new();
        collect_terms(doc, &mut terms);
        for term in &terms {
            state
                .terms
                .entry(term.clone())
                .or_default()
                .insert(key.clone());
        }
        state.docs.insert(key, terms);
        Ok(())
    }

    fn remove(&self, kind: &str, id: Uuid) -> Result<(), MirrorError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MirrorError::Unavailable("search index poisoned".to_string()))?;
        let key = (kind.to_string(), id);
        if let Some(terms) = state.docs.remove(&key) {
            for term in terms {
                if let Some(set) = state.terms.get_mut(&term) {
                    set.remove(&key);
                    if set.is_empty() {
                        state.terms.remove(&term);
                    }
                }
            }
        }
        Ok(())
    }
}

fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Pull indexable terms out of the string leaves of a projected document.
fn collect_terms(value: &Value, terms: &mut HashSet<String>) {
    match value {
        Value::String(s) => {
            for token in tokenize_query(s) {
                terms.insert(token);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect_terms(v, terms);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_terms(v, terms);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_and_search() {
        let mirror = SearchIndexMirror::new();
        let id = Uuid::new_v4();
        mirror
            .upsert("loan", id, &json!({"loanNumber": "LN-100", "borrower": "Ada Lovelace"}))
            .unwrap();

        let hits = mirror.search("lovelace");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
        assert_eq!(hits[0].kind, "loan");
    }

    #[test]
    fn test_reindex_replaces_old_terms() {
        let mirror = SearchIndexMirror::new();
        let id = Uuid::new_v4();
        mirror.upsert("loan", id, &json!({"borrower": "Ada"})).unwrap();
        mirror.upsert("loan", id, &json!({"borrower": "Grace"})).unwrap();

        assert!(mirror.search("ada").is_empty());
        assert_eq!(mirror.search("grace").len(), 1);
    }

    #[test]
    fn test_remove_clears_doc() {
        let mirror = SearchIndexMirror::new();
        let id = Uuid::new_v4();
        mirror.upsert("loan", id, &json!({"borrower": "Ada"})).unwrap();
        mirror.remove("loan", id).unwrap();

        assert!(mirror.search("ada").is_empty());
        assert_eq!(mirror.doc_count(), 0);
    }

    #[test]
    fn test_multi_term_query_intersects() {
        let mirror = SearchIndexMirror::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        mirror.upsert("loan", a, &json!({"borrower": "Ada Lovelace"})).unwrap();
        mirror.upsert("loan", b, &json!({"borrower": "Ada Byron"})).unwrap();

        assert_eq!(mirror.search("ada").len(), 2);
        assert_eq!(mirror.search("ada lovelace").len(), 1);
    }
}
