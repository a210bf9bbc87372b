//! Commitment API routes

use crate::boarding::Agency;
use crate::commitment::{Commitment, CommitmentStatus};
use crate::error::{not_found_error, ApiResult, AppError};
use crate::state::SharedState;
use crate::store::StoreSummary;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCommitmentRequest {
    pub commitment_id: String,
    pub loan_number: String,
    pub agency: Agency,
    pub commitment_amount: f64,
    pub pass_through_rate: f64,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: CommitmentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentListQuery {
    pub status: Option<CommitmentStatus>,
    pub agency: Option<Agency>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Lookup by either secondary key. Exactly one must be given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentLookupQuery {
    pub commitment_id: Option<String>,
    pub loan_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentResponse {
    pub success: bool,
    pub commitment: Commitment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentListResponse {
    pub success: bool,
    pub commitments: Vec<Commitment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentSummaryResponse {
    pub success: bool,
    pub summary: StoreSummary<Commitment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearStagedResponse {
    pub success: bool,
    pub cleared: usize,
}

pub async fn stage_commitment(
    State(state): State<SharedState>,
    Json(req): Json<StageCommitmentRequest>,
) -> ApiResult<Json<CommitmentResponse>> {
    let commitment = state
        .commitments
        .stage(Commitment::new(
            req.commitment_id,
            req.loan_number,
            req.agency,
            req.commitment_amount,
            req.pass_through_rate,
            req.expires_at,
        ))
        .await?;
    tracing::info!(
        commitment_id = %commitment.commitment_id,
        loan_number = %commitment.loan_number,
        "commitment staged"
    );
    Ok(Json(CommitmentResponse {
        success: true,
        commitment,
    }))
}

pub async fn list_commitments(
    State(state): State<SharedState>,
    Query(q): Query<CommitmentListQuery>,
) -> Json<CommitmentListResponse> {
    let commitments = state
        .commitments
        .query(q.status, q.agency, q.created_from, q.created_to)
        .await;
    Json(CommitmentListResponse {
        success: true,
        commitments,
    })
}

pub async fn get_commitment(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommitmentResponse>> {
    let commitment = state
        .commitments
        .get(id)
        .await
        .ok_or_else(|| not_found_error(format!("Commitment {} not found", id)))?;
    Ok(Json(CommitmentResponse {
        success: true,
        commitment,
    }))
}

pub async fn lookup_commitment(
    State(state): State<SharedState>,
    Query(q): Query<CommitmentLookupQuery>,
) -> ApiResult<Json<CommitmentResponse>> {
    let commitment = match (&q.commitment_id, &q.loan_number) {
        (Some(cm), None) => state.commitments.get_by_commitment_id(cm).await,
        (None, Some(ln)) => state.commitments.get_by_loan_number(ln).await,
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of commitmentId or loanNumber".to_string(),
            ))
        }
    }
    .ok_or_else(|| not_found_error("Commitment not found".to_string()))?;
    Ok(Json(CommitmentResponse {
        success: true,
        commitment,
    }))
}

pub async fn list_active_commitments(
    State(state): State<SharedState>,
) -> Json<CommitmentListResponse> {
    let commitments = state.commitments.list_active(Utc::now()).await;
    Json(CommitmentListResponse {
        success: true,
        commitments,
    })
}

pub async fn update_commitment_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<CommitmentResponse>> {
    let commitment = state
        .commitments
        .update_status(id, req.status)
        .await?
        .ok_or_else(|| not_found_error(format!("Commitment {} not found", id)))?;
    Ok(Json(CommitmentResponse {
        success: true,
        commitment,
    }))
}

pub async fn delete_commitment(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.commitments.delete(id).await {
        return Err(not_found_error(format!("Commitment {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn clear_staged(State(state): State<SharedState>) -> Json<ClearStagedResponse> {
    let cleared = state.commitments.clear_staged().await;
    Json(ClearStagedResponse {
        success: true,
        cleared,
    })
}

pub async fn commitment_summary(
    State(state): State<SharedState>,
) -> Json<CommitmentSummaryResponse> {
    Json(CommitmentSummaryResponse {
        success: true,
        summary: state.commitments.summary().await,
    })
}
