//! Boarding entity models
//!
//! Defines the record types the boarding pipeline writes into the stores.
//! Every kind carries a generated id, lifecycle timestamps and a status enum
//! used as its primary grouping dimension.

use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agency a loan is sold to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agency {
    Fnma,
    Fhlmc,
    Gnma,
    Private,
}

impl Agency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agency::Fnma => "fnma",
            Agency::Fhlmc => "fhlmc",
            Agency::Gnma => "gnma",
            Agency::Private => "private",
        }
    }
}

/// Where a loan sits in the boarding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Intake complete, boarding in progress
    Boarding,
    /// Held for manual review
    Review,
    /// Blocked on open exceptions
    Exception,
    /// Fully boarded
    Boarded,
    /// Suspended by operations
    Suspended,
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Boarding
    }
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Boarding => "boarding",
            LoanStatus::Review => "review",
            LoanStatus::Exception => "exception",
            LoanStatus::Boarded => "boarded",
            LoanStatus::Suspended => "suspended",
        }
    }
}

/// A loan being boarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    /// Servicer loan number (unique)
    pub loan_number: String,
    pub agency: Agency,
    pub borrower_name: String,
    pub principal_amount: f64,
    pub note_rate: f64,
    pub status: LoanStatus,
    /// When boarding completed (if it has)
    pub boarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn new(
        loan_number: String,
        agency: Agency,
        borrower_name: String,
        principal_amount: f64,
        note_rate: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            loan_number,
            agency,
            borrower_name,
            principal_amount,
            note_rate,
            status: LoanStatus::default(),
            boarded_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Loan {
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

/// Document pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Classified,
    Extracted,
    Validated,
    Completed,
    Error,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Pending
    }
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Classified => "classified",
            DocumentStatus::Extracted => "extracted",
            DocumentStatus::Validated => "validated",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Error => "error",
        }
    }
}

/// A document attached to a loan, moving through the OCR pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    /// Parent loan
    pub loan_id: Uuid,
    pub doc_type: String,
    pub file_name: String,
    pub page_count: Option<u32>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(loan_id: Uuid, doc_type: String, file_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            loan_id,
            doc_type,
            file_name,
            page_count: None,
            status: DocumentStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Document {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExceptionSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionSeverity::Low => "low",
            ExceptionSeverity::Medium => "medium",
            ExceptionSeverity::High => "high",
            ExceptionSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl Default for ExceptionStatus {
    fn default() -> Self {
        ExceptionStatus::Open
    }
}

impl ExceptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Open => "open",
            ExceptionStatus::Acknowledged => "acknowledged",
            ExceptionStatus::Resolved => "resolved",
        }
    }
}

/// A boarding exception raised by a detection rule against a loan.
/// Rejecting an exception deletes the record outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    pub id: Uuid,
    pub loan_id: Uuid,
    /// Detection rule that fired (e.g. "MISSING_NOTE")
    pub rule_code: String,
    pub severity: ExceptionSeverity,
    pub description: String,
    pub status: ExceptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExceptionRecord {
    pub fn new(
        loan_id: Uuid,
        rule_code: String,
        severity: ExceptionSeverity,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            loan_id,
            rule_code,
            severity,
            description,
            status: ExceptionStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for ExceptionRecord {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Recorded,
    Reviewed,
}

impl Default for ComplianceStatus {
    fn default() -> Self {
        ComplianceStatus::Recorded
    }
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Recorded => "recorded",
            ComplianceStatus::Reviewed => "reviewed",
        }
    }
}

/// An append-mostly compliance event tied to a loan and an agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceEvent {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub agency: Agency,
    /// Event kind (e.g. "HMDA_REPORTED", "RESPA_DISCLOSURE")
    pub event_kind: String,
    pub detail: String,
    /// When the underlying event happened, as reported by the source
    pub occurred_at: DateTime<Utc>,
    pub status: ComplianceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceEvent {
    pub fn new(
        loan_id: Uuid,
        agency: Agency,
        event_kind: String,
        detail: String,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            loan_id,
            agency,
            event_kind,
            detail,
            occurred_at,
            status: ComplianceStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for ComplianceEvent {
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
