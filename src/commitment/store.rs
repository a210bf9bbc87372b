//! Commitment storage
//!
//! Unique on both the agency commitment id and the covered loan number;
//! grouped by status and agency. Staging is cleared in bulk once uploads are
//! matched.

use crate::boarding::Agency;
use crate::commitment::models::{Commitment, CommitmentStatus};
use crate::error::AppError;
use crate::mirror::MirrorSender;
use crate::store::{DuplicateKeyPolicy, EntityStore, Query, StoreSummary};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub struct CommitmentStore {
    inner: EntityStore<Commitment>,
}

impl CommitmentStore {
    pub fn new(
        policy: DuplicateKeyPolicy,
        recent_limit: usize,
        mirror: Option<MirrorSender>,
    ) -> Self {
        let mut builder = EntityStore::builder("commitment")
            .policy(policy)
            .recent_limit(recent_limit)
            .unique("commitment_id", |c: &Commitment| {
                Some(c.commitment_id.clone())
            })
            .unique("loan_number", |c: &Commitment| Some(c.loan_number.clone()))
            .grouping("status", |c: &Commitment| Some(c.status.as_str().to_string()))
            .grouping("agency", |c: &Commitment| Some(c.agency.as_str().to_string()))
            .summary_group("agency");
        if let Some(tx) = mirror {
            builder = builder.mirror(tx, |c: &Commitment| {
                json!({
                    "commitmentId": c.commitment_id,
                    "loanNumber": c.loan_number,
                    "agency": c.agency.as_str(),
                    "status": c.status.as_str(),
                })
            });
        }
        Self {
            inner: builder.build(),
        }
    }

    /// Stage a commitment from an agency upload.
    pub async fn stage(&self, commitment: Commitment) -> Result<Commitment, AppError> {
        self.inner.create(commitment).await
    }

    pub async fn get(&self, id: Uuid) -> Option<Commitment> {
        self.inner.get(id).await
    }

    pub async fn get_by_commitment_id(&self, commitment_id: &str) -> Option<Commitment> {
        self.inner.get_by_unique("commitment_id", commitment_id).await
    }

    pub async fn get_by_loan_number(&self, loan_number: &str) -> Option<Commitment> {
        self.inner.get_by_unique("loan_number", loan_number).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: CommitmentStatus,
    ) -> Result<Option<Commitment>, AppError> {
        self.inner.update(id, |c| c.status = status).await
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        self.inner.delete(id).await
    }

    /// Drop everything still in the staged bucket. Returns how many went.
    pub async fn clear_staged(&self) -> usize {
        let cleared = self
            .inner
            .delete_group("status", CommitmentStatus::Staged.as_str())
            .await;
        if cleared > 0 {
            info!(cleared, "cleared staged commitments");
        }
        cleared
    }

    pub async fn query(
        &self,
        status: Option<CommitmentStatus>,
        agency: Option<Agency>,
        created_from: Option<DateTime<Utc>>,
        created_to: Option<DateTime<Utc>>,
    ) -> Vec<Commitment> {
        let mut q = Query::new().created_between(created_from, created_to);
        if let Some(status) = status {
            q = q.group("status", status.as_str());
        }
        if let Some(agency) = agency {
            q = q.group("agency", agency.as_str());
        }
        self.inner.query(q).await
    }

    /// Active commitments whose advisory expiration has not passed.
    /// Expiration filtering is the caller's concern; this is the reference
    /// filter the route layer uses.
    pub async fn list_active(&self, as_of: DateTime<Utc>) -> Vec<Commitment> {
        self.inner
            .query(Query::new().group("status", CommitmentStatus::Active.as_str()))
            .await
            .into_iter()
            .filter(|c| c.expires_at.map_or(true, |exp| exp >= as_of))
            .collect()
    }

    pub async fn summary(&self) -> StoreSummary<Commitment> {
        self.inner.summary().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn commitment(cm: &str, ln: &str) -> Commitment {
        Commitment::new(
            cm.to_string(),
            ln.to_string(),
            Agency::Fnma,
            250_000.0,
            5.5,
            None,
        )
    }

    fn store() -> CommitmentStore {
        CommitmentStore::new(DuplicateKeyPolicy::Reject, 10, None)
    }

    #[tokio::test]
    async fn test_dual_unique_lookup_and_status_move() {
        let store = store();
        let staged = store.stage(commitment("CM1", "LN1")).await.unwrap();

        let by_cm = store.get_by_commitment_id("CM1").await.unwrap();
        let by_ln = store.get_by_loan_number("LN1").await.unwrap();
        assert_eq!(by_cm, by_ln);
        assert_eq!(by_cm.id, staged.id);

        store
            .update_status(staged.id, CommitmentStatus::Processed)
            .await
            .unwrap()
            .unwrap();

        let processed = store
            .query(Some(CommitmentStatus::Processed), None, None, None)
            .await;
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].id, staged.id);
        assert!(store
            .query(Some(CommitmentStatus::Staged), None, None, None)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_commitment_id_rejected_by_default() {
        let store = store();
        let first = store.stage(commitment("CM1", "LN1")).await.unwrap();
        let err = store.stage(commitment("CM1", "LN2")).await.unwrap_err();
        match err {
            AppError::Conflict { field, existing_id } => {
                assert_eq!(field, "commitment_id");
                assert_eq!(existing_id, first.id);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_commitment_id_overwrite_supersedes() {
        let store = CommitmentStore::new(DuplicateKeyPolicy::Overwrite, 10, None);
        let first = store.stage(commitment("CM1", "LN1")).await.unwrap();
        let second = store.stage(commitment("CM1", "LN2")).await.unwrap();

        // Latest upload wins the key; both records remain in the store.
        assert_eq!(store.get_by_commitment_id("CM1").await.unwrap().id, second.id);
        assert!(store.get(first.id).await.is_some());
        assert_eq!(store.query(None, None, None, None).await.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_staged_leaves_other_statuses() {
        let store = store();
        store.stage(commitment("CM1", "LN1")).await.unwrap();
        store.stage(commitment("CM2", "LN2")).await.unwrap();
        let active = store.stage(commitment("CM3", "LN3")).await.unwrap();
        store
            .update_status(active.id, CommitmentStatus::Active)
            .await
            .unwrap();

        assert_eq!(store.clear_staged().await, 2);
        assert_eq!(store.query(None, None, None, None).await.len(), 1);
        assert!(store.get_by_commitment_id("CM1").await.is_none());
        assert!(store.get_by_commitment_id("CM3").await.is_some());
        assert_eq!(store.clear_staged().await, 0);
    }

    #[tokio::test]
    async fn test_expiration_is_advisory_only() {
        let store = store();
        let expired = Commitment::new(
            "CM1".to_string(),
            "LN1".to_string(),
            Agency::Gnma,
            100_000.0,
            5.0,
            Some(Utc::now() - Duration::days(1)),
        );
        let staged = store.stage(expired).await.unwrap();
        store
            .update_status(staged.id, CommitmentStatus::Active)
            .await
            .unwrap();

        // Still in the store and still queryable; only list_active filters.
        assert_eq!(store.query(None, None, None, None).await.len(), 1);
        assert!(store.list_active(Utc::now()).await.is_empty());
        assert_eq!(
            store
                .query(Some(CommitmentStatus::Active), None, None, None)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_summary_counts_by_status_and_agency() {
        let store = store();
        store.stage(commitment("CM1", "LN1")).await.unwrap();
        store.stage(commitment("CM2", "LN2")).await.unwrap();

        let summary = store.summary().await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_status.get("staged"), Some(&2));
        assert_eq!(summary.by_group.get("fnma"), Some(&2));
        assert_eq!(summary.recent.len(), 2);
    }
}
