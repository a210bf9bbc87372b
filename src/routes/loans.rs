//! Loan API routes

use crate::boarding::{Agency, Loan, LoanStatus};
use crate::error::{not_found_error, ApiResult};
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
pub struct CreateLoanRequest {
    pub loan_number: String,
    pub agency: Agency,
    pub borrower_name: String,
    pub principal_amount: f64,
    pub note_rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoanRequest {
    pub borrower_name: Option<String>,
    pub note_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLoanStatusRequest {
    pub status: LoanStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanListQuery {
    pub status: Option<LoanStatus>,
    pub agency: Option<Agency>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub success: bool,
    pub loan: Loan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanListResponse {
    pub success: bool,
    pub loans: Vec<Loan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummaryResponse {
    pub success: bool,
    pub summary: StoreSummary<Loan>,
}

pub async fn create_loan(
    State(state): State<SharedState>,
    Json(req): Json<CreateLoanRequest>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state
        .loans
        .create(Loan::new(
            req.loan_number,
            req.agency,
            req.borrower_name,
            req.principal_amount,
            req.note_rate,
        ))
        .await?;
    tracing::info!(loan_number = %loan.loan_number, id = %loan.id, "loan created");
    Ok(Json(LoanResponse {
        success: true,
        loan,
    }))
}

pub async fn list_loans(
    State(state): State<SharedState>,
    Query(q): Query<LoanListQuery>,
) -> Json<LoanListResponse> {
    let loans = state
        .loans
        .query(q.status, q.agency, q.created_from, q.created_to)
        .await;
    Json(LoanListResponse {
        success: true,
        loans,
    })
}

pub async fn get_loan(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state
        .loans
        .get(id)
        .await
        .ok_or_else(|| not_found_error(format!("Loan {} not found", id)))?;
    Ok(Json(LoanResponse {
        success: true,
        loan,
    }))
}

pub async fn update_loan(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLoanRequest>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state
        .loans
        .update(id, |loan| {
            if let Some(name) = req.borrower_name {
                loan.borrower_name = name;
            }
            if let Some(rate) = req.note_rate {
                loan.note_rate = rate;
            }
        })
        .await?
        .ok_or_else(|| not_found_error(format!("Loan {} not found", id)))?;
    Ok(Json(LoanResponse {
        success: true,
        loan,
    }))
}

pub async fn update_loan_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLoanStatusRequest>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state
        .loans
        .update_status(id, req.status)
        .await?
        .ok_or_else(|| not_found_error(format!("Loan {} not found", id)))?;
    tracing::info!(id = %loan.id, status = loan.status.as_str(), "loan status changed");
    Ok(Json(LoanResponse {
        success: true,
        loan,
    }))
}

pub async fn get_loan_by_number(
    State(state): State<SharedState>,
    Path(loan_number): Path<String>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state
        .loans
        .get_by_loan_number(&loan_number)
        .await
        .ok_or_else(|| not_found_error(format!("Loan {} not found", loan_number)))?;
    Ok(Json(LoanResponse {
        success: true,
        loan,
    }))
}

pub async fn delete_loan(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.loans.delete(id).await {
        return Err(not_found_error(format!("Loan {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn loan_summary(State(state): State<SharedState>) -> Json<LoanSummaryResponse> {
    Json(LoanSummaryResponse {
        success: true,
        summary: state.loans.summary().await,
    })
}
