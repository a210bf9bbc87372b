//! Typed stores for the boarding entity kinds
//!
//! Each store wraps the generic multi-index `EntityStore`, declaring the
//! kind's secondary indexes and exposing its domain lookups. All of them
//! follow the same contract: absence is `None`/`false`, the only domain
//! error is a unique-key conflict, queries and summaries never fail.

use crate::boarding::models::*;
use crate::error::AppError;
use crate::mirror::MirrorSender;
use crate::store::{DuplicateKeyPolicy, EntityStore, Query, SortOrder, StoreSummary};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

/// Store for loans. Unique on loan number, grouped by status and agency.
pub struct LoanStore {
    inner: EntityStore<Loan>,
}

impl LoanStore {
    pub fn new(
        policy: DuplicateKeyPolicy,
        recent_limit: usize,
        mirror: Option<MirrorSender>,
    ) -> Self {
        let mut builder = EntityStore::builder("loan")
            .policy(policy)
            .recent_limit(recent_limit)
            .unique("loan_number", |l: &Loan| Some(l.loan_number.clone()))
            .grouping("status", |l: &Loan| Some(l.status.as_str().to_string()))
            .grouping("agency", |l: &Loan| Some(l.agency.as_str().to_string()))
            .summary_group("agency");
        if let Some(tx) = mirror {
            builder = builder.mirror(tx, |l: &Loan| {
                json!({
                    "loanNumber": l.loan_number,
                    "agency": l.agency.as_str(),
                    "borrowerName": l.borrower_name,
                    "status": l.status.as_str(),
                })
            });
        }
        Self {
            inner: builder.build(),
        }
    }

    pub async fn create(&self, loan: Loan) -> Result<Loan, AppError> {
        self.inner.create(loan).await
    }

    pub async fn get(&self, id: Uuid) -> Option<Loan> {
        self.inner.get(id).await
    }

    pub async fn get_by_loan_number(&self, loan_number: &str) -> Option<Loan> {
        self.inner.get_by_unique("loan_number", loan_number).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        mutate: impl FnOnce(&mut Loan),
    ) -> Result<Option<Loan>, AppError> {
        self.inner.update(id, mutate).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: LoanStatus,
    ) -> Result<Option<Loan>, AppError> {
        self.inner
            .update(id, |loan| {
                loan.status = status;
                if status == LoanStatus::Boarded && loan.boarded_at.is_none() {
                    loan.boarded_at = Some(Utc::now());
                }
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        self.inner.delete(id).await
    }

    pub async fn query(
        &self,
        status: Option<LoanStatus>,
        agency: Option<Agency>,
        created_from: Option<DateTime<Utc>>,
        created_to: Option<DateTime<Utc>>,
    ) -> Vec<Loan> {
        let mut q = Query::new().created_between(created_from, created_to);
        if let Some(status) = status {
            q = q.group("status", status.as_str());
        }
        if let Some(agency) = agency {
            q = q.group("agency", agency.as_str());
        }
        self.inner.query(q).await
    }

    pub async fn summary(&self) -> StoreSummary<Loan> {
        self.inner.summary().await
    }
}

/// Store for loan documents. Grouped by parent loan and pipeline status.
pub struct DocumentStore {
    inner: EntityStore<Document>,
}

impl DocumentStore {
    pub fn new(recent_limit: usize, mirror: Option<MirrorSender>) -> Self {
        let mut builder = EntityStore::builder("document")
            .recent_limit(recent_limit)
            .grouping("status", |d: &Document| Some(d.status.as_str().to_string()))
            .grouping("loan_id", |d: &Document| Some(d.loan_id.to_string()));
        if let Some(tx) = mirror {
            builder = builder.mirror(tx, |d: &Document| {
                json!({
                    "loanId": d.loan_id.to_string(),
                    "docType": d.doc_type,
                    "fileName": d.file_name,
                    "status": d.status.as_str(),
                })
            });
        }
        Self {
            inner: builder.build(),
        }
    }

    pub async fn create(&self, document: Document) -> Result<Document, AppError> {
        self.inner.create(document).await
    }

    pub async fn get(&self, id: Uuid) -> Option<Document> {
        self.inner.get(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        self.inner.update(id, |doc| doc.status = status).await
    }

    pub async fn list(&self) -> Vec<Document> {
        self.inner.list().await
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        self.inner.delete(id).await
    }

    /// Documents for one loan, most recently touched first, optionally
    /// narrowed by status.
    pub async fn list_for_loan(&self, loan_id: Uuid, status: Option<DocumentStatus>) -> Vec<Document> {
        let mut q = Query::new()
            .group("loan_id", loan_id.to_string())
            .sort(SortOrder::UpdatedDesc);
        if let Some(status) = status {
            q = q.group("status", status.as_str());
        }
        self.inner.query(q).await
    }

    pub async fn summary(&self) -> StoreSummary<Document> {
        self.inner.summary().await
    }
}

/// Store for boarding exceptions. Grouped by loan, status and severity.
pub struct ExceptionStore {
    inner: EntityStore<ExceptionRecord>,
}

impl ExceptionStore {
    pub fn new(recent_limit: usize, mirror: Option<MirrorSender>) -> Self {
        let mut builder = EntityStore::builder("exception")
            .recent_limit(recent_limit)
            .grouping("status", |e: &ExceptionRecord| {
                Some(e.status.as_str().to_string())
            })
            .grouping("severity", |e: &ExceptionRecord| {
                Some(e.severity.as_str().to_string())
            })
            .grouping("loan_id", |e: &ExceptionRecord| Some(e.loan_id.to_string()))
            .summary_group("severity");
        if let Some(tx) = mirror {
            builder = builder.mirror(tx, |e: &ExceptionRecord| {
                json!({
                    "loanId": e.loan_id.to_string(),
                    "ruleCode": e.rule_code,
                    "severity": e.severity.as_str(),
                    "description": e.description,
                    "status": e.status.as_str(),
                })
            });
        }
        Self {
            inner: builder.build(),
        }
    }

    pub async fn create(&self, exception: ExceptionRecord) -> Result<ExceptionRecord, AppError> {
        self.inner.create(exception).await
    }

    pub async fn get(&self, id: Uuid) -> Option<ExceptionRecord> {
        self.inner.get(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: ExceptionStatus,
    ) -> Result<Option<ExceptionRecord>, AppError> {
        self.inner.update(id, |e| e.status = status).await
    }

    /// Rejecting an exception removes the record outright.
    pub async fn reject(&self, id: Uuid) -> bool {
        self.inner.delete(id).await
    }

    pub async fn list_for_loan(&self, loan_id: Uuid) -> Vec<ExceptionRecord> {
        self.inner
            .query(Query::new().group("loan_id", loan_id.to_string()))
            .await
    }

    pub async fn query(
        &self,
        status: Option<ExceptionStatus>,
        severity: Option<ExceptionSeverity>,
    ) -> Vec<ExceptionRecord> {
        let mut q = Query::new();
        if let Some(status) = status {
            q = q.group("status", status.as_str());
        }
        if let Some(severity) = severity {
            q = q.group("severity", severity.as_str());
        }
        self.inner.query(q).await
    }

    pub async fn summary(&self) -> StoreSummary<ExceptionRecord> {
        self.inner.summary().await
    }
}

/// Store for compliance events. Grouped by loan, agency and status.
pub struct ComplianceStore {
    inner: EntityStore<ComplianceEvent>,
}

impl ComplianceStore {
    pub fn new(recent_limit: usize, mirror: Option<MirrorSender>) -> Self {
        let mut builder = EntityStore::builder("compliance_event")
            .recent_limit(recent_limit)
            .grouping("status", |e: &ComplianceEvent| {
                Some(e.status.as_str().to_string())
            })
            .grouping("agency", |e: &ComplianceEvent| {
                Some(e.agency.as_str().to_string())
            })
            .grouping("loan_id", |e: &ComplianceEvent| Some(e.loan_id.to_string()))
            .summary_group("agency");
        if let Some(tx) = mirror {
            builder = builder.mirror(tx, |e: &ComplianceEvent| {
                json!({
                    "loanId": e.loan_id.to_string(),
                    "agency": e.agency.as_str(),
                    "eventKind": e.event_kind,
                    "detail": e.detail,
                })
            });
        }
        Self {
            inner: builder.build(),
        }
    }

    pub async fn create(&self, event: ComplianceEvent) -> Result<ComplianceEvent, AppError> {
        self.inner.create(event).await
    }

    pub async fn get(&self, id: Uuid) -> Option<ComplianceEvent> {
        self.inner.get(id).await
    }

    pub async fn mark_reviewed(&self, id: Uuid) -> Result<Option<ComplianceEvent>, AppError> {
        self.inner
            .update(id, |e| e.status = ComplianceStatus::Reviewed)
            .await
    }

    pub async fn query(
        &self,
        agency: Option<Agency>,
        loan_id: Option<Uuid>,
        created_from: Option<DateTime<Utc>>,
        created_to: Option<DateTime<Utc>>,
    ) -> Vec<ComplianceEvent> {
        let mut q = Query::new()
            .created_between(created_from, created_to)
            .sort(SortOrder::CreatedDesc);
        if let Some(agency) = agency {
            q = q.group("agency", agency.as_str());
        }
        if let Some(loan_id) = loan_id {
            q = q.group("loan_id", loan_id.to_string());
        }
        self.inner.query(q).await
    }

    pub async fn summary(&self) -> StoreSummary<ComplianceEvent> {
        self.inner.summary().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loan_store() -> LoanStore {
        LoanStore::new(DuplicateKeyPolicy::Reject, 10, None)
    }

    #[tokio::test]
    async fn test_loan_number_lookup_and_conflict() {
        let store = loan_store();
        let loan = store
            .create(Loan::new(
                "LN-100".to_string(),
                Agency::Fnma,
                "Ada Lovelace".to_string(),
                250_000.0,
                6.125,
            ))
            .await
            .unwrap();

        assert_eq!(store.get_by_loan_number("LN-100").await.unwrap().id, loan.id);

        let dup = store
            .create(Loan::new(
                "LN-100".to_string(),
                Agency::Gnma,
                "Grace Hopper".to_string(),
                300_000.0,
                5.875,
            ))
            .await;
        assert!(matches!(
            dup,
            Err(AppError::Conflict { field: "loan_number", .. })
        ));
    }

    #[tokio::test]
    async fn test_loan_boarded_status_stamps_boarded_at() {
        let store = loan_store();
        let loan = store
            .create(Loan::new(
                "LN-100".to_string(),
                Agency::Fnma,
                "Ada Lovelace".to_string(),
                250_000.0,
                6.125,
            ))
            .await
            .unwrap();

        let boarded = store
            .update_status(loan.id, LoanStatus::Boarded)
            .await
            .unwrap()
            .unwrap();
        assert!(boarded.boarded_at.is_some());
        assert!(boarded.updated_at > loan.updated_at);
    }

    #[tokio::test]
    async fn test_loan_query_by_status_and_agency() {
        let store = loan_store();
        for (number, agency) in [("LN-1", Agency::Fnma), ("LN-2", Agency::Gnma)] {
            store
                .create(Loan::new(
                    number.to_string(),
                    agency,
                    "Borrower".to_string(),
                    100_000.0,
                    6.0,
                ))
                .await
                .unwrap();
        }

        let fnma = store
            .query(Some(LoanStatus::Boarding), Some(Agency::Fnma), None, None)
            .await;
        assert_eq!(fnma.len(), 1);
        assert_eq!(fnma[0].loan_number, "LN-1");

        let none = store
            .query(Some(LoanStatus::Boarded), None, None, None)
            .await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_document_pipeline_summary_scenario() {
        let store = DocumentStore::new(10, None);
        let loan_id = Uuid::new_v4();
        let statuses = [
            DocumentStatus::Pending,
            DocumentStatus::Processing,
            DocumentStatus::Classified,
            DocumentStatus::Extracted,
            DocumentStatus::Validated,
        ];
        for (i, status) in statuses.iter().enumerate() {
            let doc = store
                .create(Document::new(
                    loan_id,
                    "note".to_string(),
                    format!("doc-{i}.pdf"),
                ))
                .await
                .unwrap();
            store.update_status(doc.id, *status).await.unwrap();
        }

        let summary = store.summary().await;
        assert_eq!(summary.total, 5);
        assert_eq!(summary.by_status.len(), 5);
        assert!(summary.by_status.values().all(|&n| n == 1));

        let pending = store
            .list_for_loan(loan_id, Some(DocumentStatus::Pending))
            .await;
        assert_eq!(pending.len(), 1);
        assert!(store.delete(pending[0].id).await);

        let summary = store.summary().await;
        assert_eq!(summary.total, 4);
        assert!(!summary.by_status.contains_key("pending"));
        assert_eq!(summary.by_status.values().sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn test_documents_scoped_to_their_loan() {
        let store = DocumentStore::new(10, None);
        let loan_a = Uuid::new_v4();
        let loan_b = Uuid::new_v4();
        store
            .create(Document::new(loan_a, "note".to_string(), "a.pdf".to_string()))
            .await
            .unwrap();
        store
            .create(Document::new(loan_b, "deed".to_string(), "b.pdf".to_string()))
            .await
            .unwrap();

        let docs = store.list_for_loan(loan_a, None).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "a.pdf");
    }

    #[tokio::test]
    async fn test_loan_documents_most_recently_touched_first() {
        let store = DocumentStore::new(10, None);
        let loan_id = Uuid::new_v4();
        let first = store
            .create(Document::new(loan_id, "note".to_string(), "a.pdf".to_string()))
            .await
            .unwrap();
        store
            .create(Document::new(loan_id, "deed".to_string(), "b.pdf".to_string()))
            .await
            .unwrap();

        // Touching the older document moves it to the front.
        store
            .update_status(first.id, DocumentStatus::Processing)
            .await
            .unwrap();
        let docs = store.list_for_loan(loan_id, None).await;
        assert_eq!(docs[0].file_name, "a.pdf");
        assert_eq!(docs[1].file_name, "b.pdf");
    }

    #[tokio::test]
    async fn test_exception_reject_deletes() {
        let store = ExceptionStore::new(10, None);
        let loan_id = Uuid::new_v4();
        let exc = store
            .create(ExceptionRecord::new(
                loan_id,
                "MISSING_NOTE".to_string(),
                ExceptionSeverity::High,
                "Promissory note not found".to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(store.list_for_loan(loan_id).await.len(), 1);
        assert!(store.reject(exc.id).await);
        assert!(store.get(exc.id).await.is_none());
        assert!(store.list_for_loan(loan_id).await.is_empty());
        assert!(!store.reject(exc.id).await);
    }

    #[tokio::test]
    async fn test_exception_query_by_status_and_severity() {
        let store = ExceptionStore::new(10, None);
        let loan_id = Uuid::new_v4();
        let high = store
            .create(ExceptionRecord::new(
                loan_id,
                "MISSING_NOTE".to_string(),
                ExceptionSeverity::High,
                "note".to_string(),
            ))
            .await
            .unwrap();
        store
            .create(ExceptionRecord::new(
                loan_id,
                "RATE_MISMATCH".to_string(),
                ExceptionSeverity::Low,
                "rate".to_string(),
            ))
            .await
            .unwrap();
        store
            .update_status(high.id, ExceptionStatus::Acknowledged)
            .await
            .unwrap();

        let open = store.query(Some(ExceptionStatus::Open), None).await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].rule_code, "RATE_MISMATCH");

        let hits = store
            .query(Some(ExceptionStatus::Acknowledged), Some(ExceptionSeverity::High))
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, high.id);
    }

    #[tokio::test]
    async fn test_compliance_summary_by_agency() {
        let store = ComplianceStore::new(10, None);
        let loan_id = Uuid::new_v4();
        for agency in [Agency::Fnma, Agency::Fnma, Agency::Gnma] {
            store
                .create(ComplianceEvent::new(
                    loan_id,
                    agency,
                    "HMDA_REPORTED".to_string(),
                    "reported".to_string(),
                    Utc::now(),
                ))
                .await
                .unwrap();
        }

        let summary = store.summary().await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_group.get("fnma"), Some(&2));
        assert_eq!(summary.by_group.get("gnma"), Some(&1));
        assert_eq!(summary.by_status.get("recorded"), Some(&3));

        let gnma = store.query(Some(Agency::Gnma), None, None, None).await;
        assert_eq!(gnma.len(), 1);
    }

    #[tokio::test]
    async fn test_compliance_review_moves_status_bucket() {
        let store = ComplianceStore::new(10, None);
        let event = store
            .create(ComplianceEvent::new(
                Uuid::new_v4(),
                Agency::Fhlmc,
                "RESPA_DISCLOSURE".to_string(),
                "disclosure sent".to_string(),
                Utc::now(),
            ))
            .await
            .unwrap();

        let reviewed = store.mark_reviewed(event.id).await.unwrap().unwrap();
        assert_eq!(reviewed.status, ComplianceStatus::Reviewed);

        let summary = store.summary().await;
        assert_eq!(summary.by_status.get("reviewed"), Some(&1));
        assert!(!summary.by_status.contains_key("recorded"));

        assert!(store.mark_reviewed(Uuid::new_v4()).await.unwrap().is_none());
    }
}
