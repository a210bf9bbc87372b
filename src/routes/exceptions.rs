//! Exception API routes

use crate::boarding::{ExceptionRecord, ExceptionSeverity, ExceptionStatus};
use crate::error::{not_found_error, ApiResult};
use crate::state::SharedState;
use crate::store::StoreSummary;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExceptionRequest {
    pub loan_id: Uuid,
    pub rule_code: String,
    pub severity: ExceptionSeverity,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionListQuery {
    pub status: Option<ExceptionStatus>,
    pub severity: Option<ExceptionSeverity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionResponse {
    pub success: bool,
    pub exception: ExceptionRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionListResponse {
    pub success: bool,
    pub exceptions: Vec<ExceptionRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionSummaryResponse {
    pub success: bool,
    pub summary: StoreSummary<ExceptionRecord>,
}

pub async fn create_exception(
    State(state): State<SharedState>,
    Json(req): Json<CreateExceptionRequest>,
) -> ApiResult<Json<ExceptionResponse>> {
    let exception = state
        .exceptions
        .create(ExceptionRecord::new(
            req.loan_id,
            req.rule_code,
            req.severity,
            req.description,
        ))
        .await?;
    tracing::info!(
        rule = %exception.rule_code,
        severity = exception.severity.as_str(),
        loan_id = %exception.loan_id,
        "exception raised"
    );
    Ok(Json(ExceptionResponse {
        success: true,
        exception,
    }))
}

pub async fn get_exception(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExceptionResponse>> {
    let exception = state
        .exceptions
        .get(id)
        .await
        .ok_or_else(|| not_found_error(format!("Exception {} not found", id)))?;
    Ok(Json(ExceptionResponse {
        success: true,
        exception,
    }))
}

pub async fn list_exceptions(
    State(state): State<SharedState>,
    Query(q): Query<ExceptionListQuery>,
) -> Json<ExceptionListResponse> {
    let exceptions = state.exceptions.query(q.status, q.severity).await;
    Json(ExceptionListResponse {
        success: true,
        exceptions,
    })
}

pub async fn list_loan_exceptions(
    State(state): State<SharedState>,
    Path(loan_id): Path<Uuid>,
) -> Json<ExceptionListResponse> {
    let exceptions = state.exceptions.list_for_loan(loan_id).await;
    Json(ExceptionListResponse {
        success: true,
        exceptions,
    })
}

pub async fn acknowledge_exception(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExceptionResponse>> {
    let exception = state
        .exceptions
        .update_status(id, ExceptionStatus::Acknowledged)
        .await?
        .ok_or_else(|| not_found_error(format!("Exception {} not found", id)))?;
    Ok(Json(ExceptionResponse {
        success: true,
        exception,
    }))
}

pub async fn resolve_exception(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExceptionResponse>> {
    let exception = state
        .exceptions
        .update_status(id, ExceptionStatus::Resolved)
        .await?
        .ok_or_else(|| not_found_error(format!("Exception {} not found", id)))?;
    Ok(Json(ExceptionResponse {
        success: true,
        exception,
    }))
}

/// Rejecting an exception removes it outright.
pub async fn reject_exception(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.exceptions.reject(id).await {
        return Err(not_found_error(format!("Exception {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn exception_summary(
    State(state): State<SharedState>,
) -> Json<ExceptionSummaryResponse> {
    Json(ExceptionSummaryResponse {
        success: true,
        summary: state.exceptions.summary().await,
    })
}
