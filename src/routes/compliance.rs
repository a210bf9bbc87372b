//! Compliance event API routes

use crate::boarding::{Agency, ComplianceEvent};
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
pub struct RecordEventRequest {
    pub loan_id: Uuid,
    pub agency: Agency,
    pub event_kind: String,
    pub detail: String,
    /// Defaults to now when the source does not say.
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    pub agency: Option<Agency>,
    pub loan_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub success: bool,
    pub event: ComplianceEvent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub success: bool,
    pub events: Vec<ComplianceEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummaryResponse {
    pub success: bool,
    pub summary: StoreSummary<ComplianceEvent>,
}

pub async fn record_event(
    State(state): State<SharedState>,
    Json(req): Json<RecordEventRequest>,
) -> ApiResult<Json<EventResponse>> {
    let event = state
        .compliance
        .create(ComplianceEvent::new(
            req.loan_id,
            req.agency,
            req.event_kind,
            req.detail,
            req.occurred_at.unwrap_or_else(Utc::now),
        ))
        .await?;
    Ok(Json(EventResponse {
        success: true,
        event,
    }))
}

pub async fn get_event(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventResponse>> {
    let event = state
        .compliance
        .get(id)
        .await
        .ok_or_else(|| not_found_error(format!("Compliance event {} not found", id)))?;
    Ok(Json(EventResponse {
        success: true,
        event,
    }))
}

pub async fn list_events(
    State(state): State<SharedState>,
    Query(q): Query<EventListQuery>,
) -> Json<EventListResponse> {
    let events = state
        .compliance
        .query(q.agency, q.loan_id, q.created_from, q.created_to)
        .await;
    Json(EventListResponse {
        success: true,
        events,
    })
}

pub async fn review_event(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventResponse>> {
    let event = state
        .compliance
        .mark_reviewed(id)
        .await?
        .ok_or_else(|| not_found_error(format!("Compliance event {} not found", id)))?;
    Ok(Json(EventResponse {
        success: true,
        event,
    }))
}

pub async fn compliance_summary(
    State(state): State<SharedState>,
) -> Json<ComplianceSummaryResponse> {
    Json(ComplianceSummaryResponse {
        success: true,
        summary: state.compliance.summary().await,
    })
}
