//! Secondary index declarations and state
//!
//! Each store instance declares a set of secondary indexes over its record
//! type: unique indexes (one id per key value) and grouping indexes (a set of
//! ids per key value). Index state is mutated in the same critical section as
//! the primary map, so readers never observe a half-updated index.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// How many records may share a key value in an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one record per key value (loan number, commitment id).
    Unique,
    /// A set of records per key value (status, agency, parent loan).
    Grouping,
}

/// What to do when a create/update would duplicate a unique key value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    /// Reject the mutation with a conflict naming the field and incumbent id.
    #[default]
    Reject,
    /// Latest write supersedes: repoint the index entry at the new record.
    /// The incumbent record stays in the primary store but can no longer be
    /// found through this key.
    Overwrite,
}

impl DuplicateKeyPolicy {
    /// Parse from an environment-style string (`reject` / `overwrite`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(DuplicateKeyPolicy::Reject),
            "overwrite" => Some(DuplicateKeyPolicy::Overwrite),
            _ => None,
        }
    }
}

/// Extracts an index key from a record. `None` means the record does not
/// participate in this index.
pub type KeyFn<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// A declared secondary index over a record type.
pub struct IndexDef<T> {
    pub name: &'static str,
    pub cardinality: Cardinality,
    pub key: KeyFn<T>,
}

impl<T> IndexDef<T> {
    pub fn key_of(&self, record: &T) -> Option<String> {
        (self.key)(record)
    }
}

/// Materialized index state for one store instance.
#[derive(Default)]
pub(crate) struct IndexState {
    /// index name -> key value -> record id
    pub unique: HashMap<&'static str, HashMap<String, Uuid>>,
    /// index name -> key value -> set of record ids
    pub grouping: HashMap<&'static str, HashMap<String, HashSet<Uuid>>>,
}

impl IndexState {
    pub fn new<T>(defs: &[IndexDef<T>]) -> Self {
        let mut state = IndexState::default();
        for def in defs {
            match def.cardinality {
                Cardinality::Unique => {
                    state.unique.insert(def.name, HashMap::new());
                }
                Cardinality::Grouping => {
                    state.grouping.insert(def.name, HashMap::new());
                }
            }
        }
        state
    }

    /// Current holder of a unique key, if any.
    pub fn unique_holder(&self, index: &str, key: &str) -> Option<Uuid> {
        self.unique.get(index).and_then(|m| m.get(key)).copied()
    }

    pub fn insert_unique(&mut self, index: &'static str, key: String, id: Uuid) {
        if let Some(m) = self.unique.get_mut(index) {
            m.insert(key, id);
        }
    }

    /// Remove a unique entry only if it still points at `id`. Under the
    /// overwrite policy another record may have taken the key since.
    pub fn remove_unique(&mut self, index: &str, key: &str, id: Uuid) {
        if let Some(m) = self.unique.get_mut(index) {
            if m.get(key) == Some(&id) {
                m.remove(key);
            }
        }
    }

    pub fn insert_grouping(&mut self, index: &'static str, key: String, id: Uuid) {
        if let Some(m) = self.grouping.get_mut(index) {
            m.entry(key).or_default().insert(id);
        }
    }

    pub fn remove_grouping(&mut self, index: &str, key: &str, id: Uuid) {
        if let Some(m) = self.grouping.get_mut(index) {
            if let Some(bucket) = m.get_mut(key) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    m.remove(key);
                }
            }
        }
    }

    pub fn group(&self, index: &str, key: &str) -> Option<&HashSet<Uuid>> {
        self.grouping.get(index).and_then(|m| m.get(key))
    }

    /// Per-key counts for a grouping index, computed from the buckets rather
    /// than a record scan.
    pub fn group_counts(&self, index: &str) -> Vec<(String, usize)> {
        self.grouping
            .get(index)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.len())).collect())
            .unwrap_or_default()
    }
}
