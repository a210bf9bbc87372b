//! Agency commitment domain
//!
//! Commitments staged from agency uploads, matched to loans and activated.

pub mod models;
pub mod store;

pub use models::{Commitment, CommitmentStatus};
pub use store::CommitmentStore;
