//! Relationship graph mirror
//!
//! A write-only triple log recording relationships between records (document
//! belongs to loan, commitment covers loan). No query surface beyond edge
//! counts; the graph is a sink, not a source.

use super::{Mirror, MirrorError};
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

/// One edge in the relationship log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: &'static str,
    pub object: String,
}

/// Document fields that induce edges when present.
const EDGE_FIELDS: &[(&str, &str)] = &[
    ("loanId", "belongs_to_loan"),
    ("loanNumber", "covers_loan_number"),
    ("agency", "sold_to_agency"),
];

#[derive(Default)]
pub struct RelationshipGraph {
    triples: Mutex<Vec<Triple>>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_count(&self) -> usize {
        match self.triples.lock() {
            Ok(t) => t.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Mirror for RelationshipGraph {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn upsert(&self, kind: &str, id: Uuid, doc: &Value) -> Result<(), MirrorError> {
        let subject = format!("{}:{}", kind, id);
        let mut triples = self
            .triples
            .lock()
            .map_err(|_| MirrorError::Unavailable("graph log poisoned".to_string()))?;

        // Replace this subject's edges with the current projection.
        triples.retain(|t| t.subject != subject);
        for &(field, predicate) in EDGE_FIELDS {
            if let Some(object) = doc.get(field).and_then(Value::as_str) {
                triples.push(Triple {
                    subject: subject.clone(),
                    predicate,
                    object: object.to_string(),
                });
            }
        }
        Ok(())
    }

    fn remove(&self, kind: &str, id: Uuid) -> Result<(), MirrorError> {
        let subject = format!("{}:{}", kind, id);
        let mut triples = self
            .triples
            .lock()
            .map_err(|_| MirrorError::Unavailable("graph log poisoned".to_string()))?;
        triples.retain(|t| t.subject != subject);
        Ok(())
    }
}
