//! Commitment data models

use crate::boarding::Agency;
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commitment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    /// Uploaded but not yet matched to a loan
    Staged,
    /// Matched and processed by the pipeline
    Processed,
    /// Funding commitment in force
    Active,
    /// Past its expiration date
    Expired,
}

impl Default for CommitmentStatus {
    fn default() -> Self {
        CommitmentStatus::Staged
    }
}

impl CommitmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentStatus::Staged => "staged",
            CommitmentStatus::Processed => "processed",
            CommitmentStatus::Active => "active",
            CommitmentStatus::Expired => "expired",
        }
    }
}

/// An agency funding commitment for one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub id: Uuid,
    /// Agency-assigned commitment id (unique)
    pub commitment_id: String,
    /// Loan number covered by this commitment (unique)
    pub loan_number: String,
    pub agency: Agency,
    pub commitment_amount: f64,
    pub pass_through_rate: f64,
    pub status: CommitmentStatus,
    /// Advisory expiration. The store never evicts on it; callers filter.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commitment {
    pub fn new(
        commitment_id: String,
        loan_number: String,
        agency: Agency,
        commitment_amount: f64,
        pass_through_rate: f64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            commitment_id,
            loan_number,
            agency,
            commitment_amount,
            pass_through_rate,
            status: CommitmentStatus::default(),
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Commitment {
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
