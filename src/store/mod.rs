//! Multi-index entity store
//!
//! The authoritative in-process store for one record kind: a primary
//! `id -> record` map plus declared secondary indexes (unique and grouping),
//! all guarded by a single `RwLock` so a mutation commits the primary write
//! and every index write in one critical section. Mirror propagation happens
//! after the lock is released and is best-effort only; reads never consult
//! mirrors.

pub mod index;
pub mod query;

pub use index::{Cardinality, DuplicateKeyPolicy, IndexDef, KeyFn};
pub use query::{Query, SortOrder, StoreSummary};

use crate::error::AppError;
use crate::mirror::{MirrorEvent, MirrorSender};
use chrono::{DateTime, Duration, Utc};
use index::IndexState;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Behavior every stored record kind provides.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// Projects the fields of a record that mirrors should see.
pub type Projection<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

struct MirrorLink<T> {
    tx: MirrorSender,
    project: Projection<T>,
}

struct Inner<T> {
    records: HashMap<Uuid, T>,
    indexes: IndexState,
}

/// The store for one entity kind.
pub struct EntityStore<T: Entity> {
    kind: &'static str,
    defs: Vec<IndexDef<T>>,
    policy: DuplicateKeyPolicy,
    status_index: &'static str,
    summary_group: Option<&'static str>,
    recent_limit: usize,
    mirror: Option<MirrorLink<T>>,
    inner: RwLock<Inner<T>>,
}

/// Builder declaring a store's indexes and policies.
pub struct EntityStoreBuilder<T: Entity> {
    kind: &'static str,
    defs: Vec<IndexDef<T>>,
    policy: DuplicateKeyPolicy,
    status_index: &'static str,
    summary_group: Option<&'static str>,
    recent_limit: usize,
    mirror: Option<MirrorLink<T>>,
}

impl<T: Entity> EntityStoreBuilder<T> {
    /// Declare a unique index: one record per key value.
    pub fn unique(
        mut self,
        name: &'static str,
        key: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.defs.push(IndexDef {
            name,
            cardinality: Cardinality::Unique,
            key: Box::new(key),
        });
        self
    }

    /// Declare a grouping index: a set of records per key value.
    pub fn grouping(
        mut self,
        name: &'static str,
        key: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.defs.push(IndexDef {
            name,
            cardinality: Cardinality::Grouping,
            key: Box::new(key),
        });
        self
    }

    pub fn policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Grouping index used for the summary's secondary dimension.
    pub fn summary_group(mut self, name: &'static str) -> Self {
        self.summary_group = Some(name);
        self
    }

    pub fn recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Attach mirror propagation with the given field projection.
    pub fn mirror(
        mut self,
        tx: MirrorSender,
        project: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.mirror = Some(MirrorLink {
            tx,
            project: Box::new(project),
        });
        self
    }

    pub fn build(self) -> EntityStore<T> {
        let indexes = IndexState::new(&self.defs);
        EntityStore {
            kind: self.kind,
            defs: self.defs,
            policy: self.policy,
            status_index: self.status_index,
            summary_group: self.summary_group,
            recent_limit: self.recent_limit,
            mirror: self.mirror,
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                indexes,
            }),
        }
    }
}

impl<T: Entity> EntityStore<T> {
    /// Start declaring a store. By convention every kind declares a
    /// `"status"` grouping index; the summary reads it.
    pub fn builder(kind: &'static str) -> EntityStoreBuilder<T> {
        EntityStoreBuilder {
            kind,
            defs: Vec::new(),
            policy: DuplicateKeyPolicy::default(),
            status_index: "status",
            summary_group: None,
            recent_limit: 10,
            mirror: None,
        }
    }

    /// Insert a new record. The only possible failure is a unique-key
    /// conflict under the `Reject` policy.
    pub async fn create(&self, record: T) -> Result<T, AppError> {
        let id = record.id();
        {
            let mut inner = self.inner.write().await;

            for def in self.defs.iter().filter(|d| d.cardinality == Cardinality::Unique) {
                if let Some(key) = def.key_of(&record) {
                    if let Some(holder) = inner.indexes.unique_holder(def.name, &key) {
                        if holder != id && self.policy == DuplicateKeyPolicy::Reject {
                            return Err(AppError::Conflict {
                                field: def.name,
                                existing_id: holder,
                            });
                        }
                    }
                }
            }

            inner.records.insert(id, record.clone());
            for def in &self.defs {
                if let Some(key) = def.key_of(&record) {
                    match def.cardinality {
                        Cardinality::Unique => inner.indexes.insert_unique(def.name, key, id),
                        Cardinality::Grouping => inner.indexes.insert_grouping(def.name, key, id),
                    }
                }
            }
        }
        self.emit_upsert(&record);
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        let inner = self.inner.read().await;
        inner.records.get(&id).cloned()
    }

    /// Lookup through a declared unique index.
    pub async fn get_by_unique(&self, index: &str, key: &str) -> Option<T> {
        let inner = self.inner.read().await;
        let id = inner.indexes.unique_holder(index, key)?;
        inner.records.get(&id).cloned()
    }

    /// Apply a mutation to an existing record. Returns `Ok(None)` for an
    /// unknown id; whether that is an error is the caller's call. The
    /// mutation runs against a copy and commits only if no unique-key
    /// conflict arises, so a rejected update leaves no trace.
    pub async fn update(
        &self,
        id: Uuid,
        mutate: impl FnOnce(&mut T),
    ) -> Result<Option<T>, AppError> {
        let next = {
            let mut inner = self.inner.write().await;
            let Some(current) = inner.records.get(&id).cloned() else {
                return Ok(None);
            };

            let mut next = current.clone();
            mutate(&mut next);
            next.set_updated_at(next_timestamp(current.updated_at()));

            for def in self.defs.iter().filter(|d| d.cardinality == Cardinality::Unique) {
                if let Some(key) = def.key_of(&next) {
                    if let Some(holder) = inner.indexes.unique_holder(def.name, &key) {
                        if holder != id && self.policy == DuplicateKeyPolicy::Reject {
                            return Err(AppError::Conflict {
                                field: def.name,
                                existing_id: holder,
                            });
                        }
                    }
                }
            }

            for def in &self.defs {
                let old_key = def.key_of(&current);
                let new_key = def.key_of(&next);
                if old_key == new_key {
                    continue;
                }
                match def.cardinality {
                    Cardinality::Unique => {
                        if let Some(old) = old_key {
                            inner.indexes.remove_unique(def.name, &old, id);
                        }
                        if let Some(new) = new_key {
                            inner.indexes.insert_unique(def.name, new, id);
                        }
                    }
                    Cardinality::Grouping => {
                        if let Some(old) = old_key {
                            inner.indexes.remove_grouping(def.name, &old, id);
                        }
                        if let Some(new) = new_key {
                            inner.indexes.insert_grouping(def.name, new, id);
                        }
                    }
                }
            }

            inner.records.insert(id, next.clone());
            next
        };
        self.emit_upsert(&next);
        Ok(Some(next))
    }

    /// Remove a record and every index entry referencing it. Idempotent.
    pub async fn delete(&self, id: Uuid) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            let Some(record) = inner.records.remove(&id) else {
                return false;
            };
            self.unindex(&mut inner.indexes, &record);
            record
        };
        self.emit_delete(removed.id());
        true
    }

    /// Remove every record in one grouping bucket. Returns how many went.
    pub async fn delete_group(&self, index: &str, key: &str) -> usize {
        let removed: Vec<T> = {
            let mut inner = self.inner.write().await;
            let ids: Vec<Uuid> = inner
                .indexes
                .group(index, key)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            let mut removed = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(record) = inner.records.remove(&id) {
                    self.unindex(&mut inner.indexes, &record);
                    removed.push(record);
                }
            }
            removed
        };
        let count = removed.len();
        for record in removed {
            self.emit_delete(record.id());
        }
        count
    }

    /// Snapshot of all records. Iteration order is not stable across calls.
    pub async fn list(&self) -> Vec<T> {
        let inner = self.inner.read().await;
        inner.records.values().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.records.len()
    }

    /// Filtered, sorted view. Seeds from the smallest applicable grouping
    /// bucket, then applies the remaining constraints as scan predicates.
    /// Never errors: no matches is an empty vec.
    pub async fn query(&self, q: Query) -> Vec<T> {
        let inner = self.inner.read().await;

        let mut seed: Option<&(&'static str, String)> = None;
        let mut seed_len = usize::MAX;
        for constraint in &q.group {
            if inner.indexes.grouping.contains_key(constraint.0) {
                let len = inner
                    .indexes
                    .group(constraint.0, &constraint.1)
                    .map(|s| s.len())
                    .unwrap_or(0);
                if len < seed_len {
                    seed_len = len;
                    seed = Some(constraint);
                }
            }
        }

        let mut matched: Vec<&T> = match seed {
            Some((index, key)) => inner
                .indexes
                .group(index, key)
                .map(|ids| ids.iter().filter_map(|id| inner.records.get(id)).collect())
                .unwrap_or_default(),
            None => inner.records.values().collect(),
        };

        matched.retain(|record| self.matches(record, &q));

        match q.sort {
            SortOrder::CreatedDesc => {
                matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()))
            }
            SortOrder::CreatedAsc => matched.sort_by(|a, b| a.created_at().cmp(&b.created_at())),
            SortOrder::UpdatedDesc => {
                matched.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()))
            }
        }

        let limit = q.limit.unwrap_or(usize::MAX);
        matched.into_iter().take(limit).cloned().collect()
    }

    /// Live aggregate view: total, per-status counts (from the status
    /// grouping index), optional secondary dimension, and recent records.
    pub async fn summary(&self) -> StoreSummary<T> {
        let inner = self.inner.read().await;

        let by_status = inner
            .indexes
            .group_counts(self.status_index)
            .into_iter()
            .collect();
        let by_group = self
            .summary_group
            .map(|g| inner.indexes.group_counts(g).into_iter().collect())
            .unwrap_or_default();

        let mut recent: Vec<&T> = inner.records.values().collect();
        recent.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        StoreSummary {
            total: inner.records.len(),
            by_status,
            by_group,
            recent: recent.into_iter().take(self.recent_limit).cloned().collect(),
        }
    }

    fn matches(&self, record: &T, q: &Query) -> bool {
        for (index, key) in &q.group {
            let Some(def) = self.defs.iter().find(|d| d.name == *index) else {
                return false;
            };
            if def.key_of(record).as_deref() != Some(key.as_str()) {
                return false;
            }
        }
        if let Some(from) = q.created_from {
            if record.created_at() < from {
                return false;
            }
        }
        if let Some(to) = q.created_to {
            if record.created_at() > to {
                return false;
            }
        }
        true
    }

    fn unindex(&self, indexes: &mut IndexState, record: &T) {
        let id = record.id();
        for def in &self.defs {
            if let Some(key) = def.key_of(record) {
                match def.cardinality {
                    Cardinality::Unique => indexes.remove_unique(def.name, &key, id),
                    Cardinality::Grouping => indexes.remove_grouping(def.name, &key, id),
                }
            }
        }
    }

    fn emit_upsert(&self, record: &T) {
        if let Some(link) = &self.mirror {
            let event = MirrorEvent::Upserted {
                kind: self.kind,
                id: record.id(),
                doc: (link.project)(record),
            };
            if link.tx.send(event).is_err() {
                debug!(kind = self.kind, "mirror channel closed, dropping upsert");
            }
        }
    }

    fn emit_delete(&self, id: Uuid) {
        if let Some(link) = &self.mirror {
            if link.tx.send(MirrorEvent::Deleted { kind: self.kind, id }).is_err() {
                debug!(kind = self.kind, "mirror channel closed, dropping delete");
            }
        }
    }

    /// Panics if any index entry disagrees with the primary map: unique keys
    /// must resolve to exactly the record carrying them, and grouping buckets
    /// must partition exactly the live ids that carry each key.
    #[cfg(test)]
    pub(crate) async fn assert_indexes_consistent(&self) {
        let inner = self.inner.read().await;
        for def in &self.defs {
            match def.cardinality {
                Cardinality::Unique => {
                    let map = inner.indexes.unique.get(def.name).expect("index declared");
                    for (key, id) in map {
                        let record = inner
                            .records
                            .get(id)
                            .unwrap_or_else(|| panic!("dangling unique entry {}={}", def.name, key));
                        assert_eq!(def.key_of(record).as_deref(), Some(key.as_str()));
                    }
                }
                Cardinality::Grouping => {
                    let map = inner.indexes.grouping.get(def.name).expect("index declared");
                    let mut seen = std::collections::HashSet::new();
                    for (key, ids) in map {
                        assert!(!ids.is_empty(), "empty bucket left behind for {}", key);
                        for id in ids {
                            assert!(seen.insert(*id), "id {} in two buckets of {}", id, def.name);
                            let record = inner.records.get(id).unwrap_or_else(|| {
                                panic!("dangling grouping entry {}={}", def.name, key)
                            });
                            assert_eq!(def.key_of(record).as_deref(), Some(key.as_str()));
                        }
                    }
                    let expected: std::collections::HashSet<Uuid> = inner
                        .records
                        .values()
                        .filter(|r| def.key_of(r).is_some())
                        .map(|r| r.id())
                        .collect();
                    assert_eq!(seen, expected, "grouping index {} incomplete", def.name);
                }
            }
        }
    }
}

/// Strictly-increasing update timestamp. Wall clock when it has moved on,
/// otherwise one microsecond past the previous value.
fn next_timestamp(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::testing::FailingMirror;
    use crate::mirror::MirrorHub;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: Uuid,
        serial: String,
        status: String,
        owner: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl Widget {
        fn new(serial: &str, status: &str) -> Self {
            let now = Utc::now();
            Self {
                id: Uuid::new_v4(),
                serial: serial.to_string(),
                status: status.to_string(),
                owner: None,
                created_at: now,
                updated_at: now,
            }
        }
    }

    impl Entity for Widget {
        fn id(&self) -> Uuid {
            self.id
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }
        fn set_updated_at(&mut self, at: DateTime<Utc>) {
            self.updated_at = at;
        }
    }

    fn widget_store(policy: DuplicateKeyPolicy) -> EntityStore<Widget> {
        EntityStore::builder("widget")
            .policy(policy)
            .unique("serial", |w: &Widget| Some(w.serial.clone()))
            .grouping("status", |w: &Widget| Some(w.status.clone()))
            .grouping("owner", |w: &Widget| w.owner.clone())
            .build()
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let created = store.create(Widget::new("S-1", "staged")).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(created, fetched);
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_absent() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_unique_lookup() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();
        assert_eq!(store.get_by_unique("serial", "S-1").await.unwrap().id, w.id);
        assert!(store.get_by_unique("serial", "S-2").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_serial_rejected() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let first = store.create(Widget::new("S-1", "staged")).await.unwrap();
        let err = store.create(Widget::new("S-1", "staged")).await.unwrap_err();
        match err {
            AppError::Conflict { field, existing_id } => {
                assert_eq!(field, "serial");
                assert_eq!(existing_id, first.id);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.len().await, 1);
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_duplicate_serial_overwrite_repoints_index() {
        let store = widget_store(DuplicateKeyPolicy::Overwrite);
        let first = store.create(Widget::new("S-1", "staged")).await.unwrap();
        let second = store.create(Widget::new("S-1", "staged")).await.unwrap();

        // Both records live; the key resolves to the latest writer.
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get_by_unique("serial", "S-1").await.unwrap().id, second.id);
        assert!(store.get(first.id).await.is_some());
    }

    #[tokio::test]
    async fn test_update_moves_grouping_bucket() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();

        let updated = store
            .update(w.id, |w| w.status = "processed".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "processed");

        let staged = store.query(Query::new().group("status", "staged")).await;
        let processed = store.query(Query::new().group("status", "processed")).await;
        assert!(staged.is_empty());
        assert_eq!(processed.len(), 1);
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at_strictly() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();
        let mut prev = w.updated_at;
        for _ in 0..5 {
            let next = store.update(w.id, |_| {}).await.unwrap().unwrap();
            assert!(next.updated_at > prev);
            assert_eq!(next.created_at, w.created_at);
            prev = next.updated_at;
        }
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_ok_none() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let out = store.update(Uuid::new_v4(), |_| {}).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_no_trace() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let a = store.create(Widget::new("S-1", "staged")).await.unwrap();
        let _b = store.create(Widget::new("S-2", "staged")).await.unwrap();

        let err = store
            .update(a.id, |w| w.serial = "S-2".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { field: "serial", .. }));

        // The failed mutation must not have touched the record or indexes.
        assert_eq!(store.get(a.id).await.unwrap().serial, "S-1");
        assert_eq!(store.get_by_unique("serial", "S-1").await.unwrap().id, a.id);
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_indexes() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();

        assert!(store.delete(w.id).await);
        assert!(store.get(w.id).await.is_none());
        assert!(store.get_by_unique("serial", "S-1").await.is_none());
        assert!(store.query(Query::new()).await.is_empty());
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();
        assert!(store.delete(w.id).await);
        assert!(!store.delete(w.id).await);
        assert!(!store.delete(Uuid::new_v4()).await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_group_clears_bucket_only() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        store.create(Widget::new("S-1", "staged")).await.unwrap();
        store.create(Widget::new("S-2", "staged")).await.unwrap();
        store.create(Widget::new("S-3", "active")).await.unwrap();

        assert_eq!(store.delete_group("status", "staged").await, 2);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.delete_group("status", "staged").await, 0);
        store.assert_indexes_consistent().await;
    }

    #[tokio::test]
    async fn test_query_conjunctive_filters() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let mut a = Widget::new("S-1", "staged");
        a.owner = Some("ops".to_string());
        let mut b = Widget::new("S-2", "staged");
        b.owner = Some("audit".to_string());
        let mut c = Widget::new("S-3", "active");
        c.owner = Some("ops".to_string());
        let a = store.create(a).await.unwrap();
        store.create(b).await.unwrap();
        store.create(c).await.unwrap();

        let hits = store
            .query(Query::new().group("status", "staged").group("owner", "ops"))
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);
    }

    #[tokio::test]
    async fn test_query_date_range_inclusive() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();

        let hits = store
            .query(Query::new().created_between(Some(w.created_at), Some(w.created_at)))
            .await;
        assert_eq!(hits.len(), 1);

        let later = w.created_at + Duration::seconds(1);
        let hits = store
            .query(Query::new().created_between(Some(later), None))
            .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_sorts_created_desc_by_default() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let mut older = Widget::new("S-1", "staged");
        older.created_at = Utc::now() - Duration::minutes(10);
        let older = store.create(older).await.unwrap();
        let newer = store.create(Widget::new("S-2", "staged")).await.unwrap();

        let hits = store.query(Query::new()).await;
        assert_eq!(hits[0].id, newer.id);
        assert_eq!(hits[1].id, older.id);

        let hits = store.query(Query::new().sort(SortOrder::CreatedAsc).limit(1)).await;
        assert_eq!(hits[0].id, older.id);
    }

    #[tokio::test]
    async fn test_summary_matches_live_state() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        for (serial, status) in [
            ("S-1", "pending"),
            ("S-2", "processing"),
            ("S-3", "classified"),
            ("S-4", "extracted"),
            ("S-5", "validated"),
        ] {
            store.create(Widget::new(serial, status)).await.unwrap();
        }

        let summary = store.summary().await;
        assert_eq!(summary.total, store.list().await.len());
        assert_eq!(summary.by_status.len(), 5);
        assert!(summary.by_status.values().all(|&n| n == 1));
        assert_eq!(summary.by_status.values().sum::<usize>(), summary.total);

        // Deleting the pending record drops the key entirely.
        let pending = store.query(Query::new().group("status", "pending")).await;
        assert!(store.delete(pending[0].id).await);

        let summary = store.summary().await;
        assert_eq!(summary.total, 4);
        assert!(!summary.by_status.contains_key("pending"));
        assert_eq!(summary.by_status.values().sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn test_summary_recent_is_newest_first() {
        let store = EntityStore::<Widget>::builder("widget")
            .grouping("status", |w: &Widget| Some(w.status.clone()))
            .recent_limit(2)
            .build();
        for i in 0..4 {
            let mut w = Widget::new(&format!("S-{i}"), "staged");
            w.created_at = Utc::now() - Duration::minutes(10 - i);
            store.create(w).await.unwrap();
        }

        let summary = store.summary().await;
        assert_eq!(summary.recent.len(), 2);
        assert!(summary.recent[0].created_at > summary.recent[1].created_at);
    }

    #[tokio::test]
    async fn test_indexes_consistent_across_random_op_sequence() {
        let store = widget_store(DuplicateKeyPolicy::Reject);
        let mut live = Vec::new();
        for i in 0..50 {
            match i % 4 {
                0 | 1 => {
                    let w = store
                        .create(Widget::new(&format!("S-{i}"), "staged"))
                        .await
                        .unwrap();
                    live.push(w.id);
                }
                2 if !live.is_empty() => {
                    let id = live[i % live.len()];
                    store
                        .update(id, |w| w.status = "processed".to_string())
                        .await
                        .unwrap();
                }
                _ if !live.is_empty() => {
                    let id = live.remove(i % live.len());
                    assert!(store.delete(id).await);
                }
                _ => {}
            }
            store.assert_indexes_consistent().await;
            let summary = store.summary().await;
            assert_eq!(summary.total, live.len());
            assert_eq!(summary.by_status.values().sum::<usize>(), summary.total);
        }
    }

    #[tokio::test]
    async fn test_failing_mirror_never_surfaces() {
        let failing = Arc::new(FailingMirror::new());
        let mirrors: Vec<Arc<dyn crate::mirror::Mirror>> = vec![failing.clone()];
        let hub = MirrorHub::start(mirrors);
        let store = EntityStore::<Widget>::builder("widget")
            .unique("serial", |w: &Widget| Some(w.serial.clone()))
            .grouping("status", |w: &Widget| Some(w.status.clone()))
            .mirror(hub.sender(), |w| {
                serde_json::json!({ "serial": w.serial, "status": w.status })
            })
            .build();

        let w = store.create(Widget::new("S-1", "staged")).await.unwrap();
        store
            .update(w.id, |w| w.status = "processed".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(store.delete(w.id).await);

        // Wait for the worker to drain the channel, then confirm all three
        // events reached the broken mirror without surfacing an error.
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        while failing.attempts.load(Ordering::SeqCst) < 3 {
            assert!(tokio::time::Instant::now() < deadline, "mirror never saw the events");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        store.assert_indexes_consistent().await;
        assert_eq!(store.len().await, 0);
    }
}
