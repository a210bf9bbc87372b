//! Loan boarding domain
//!
//! Entity kinds produced by the boarding pipeline (loans, documents,
//! exceptions, compliance events) and their typed stores.

pub mod models;
pub mod store;

pub use models::{
    Agency, ComplianceEvent, ComplianceStatus, Document, DocumentStatus, ExceptionRecord,
    ExceptionSeverity, ExceptionStatus, Loan, LoanStatus,
};
pub use store::{ComplianceStore, DocumentStore, ExceptionStore, LoanStore};
