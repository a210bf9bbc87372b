//! Document API routes

use crate::boarding::{Document, DocumentStatus};
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
pub struct CreateDocumentRequest {
    pub loan_id: Uuid,
    pub doc_type: String,
    pub file_name: String,
    pub page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: DocumentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListQuery {
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub success: bool,
    pub document: Document,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    pub success: bool,
    pub documents: Vec<Document>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummaryResponse {
    pub success: bool,
    pub summary: StoreSummary<Document>,
}

pub async fn create_document(
    State(state): State<SharedState>,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let mut document = Document::new(req.loan_id, req.doc_type, req.file_name);
    document.page_count = req.page_count;
    let document = state.documents.create(document).await?;
    Ok(Json(DocumentResponse {
        success: true,
        document,
    }))
}

pub async fn list_documents(State(state): State<SharedState>) -> Json<DocumentListResponse> {
    let documents = state.documents.list().await;
    Json(DocumentListResponse {
        success: true,
        documents,
    })
}

pub async fn get_document(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DocumentResponse>> {
    let document = state
        .documents
        .get(id)
        .await
        .ok_or_else(|| not_found_error(format!("Document {} not found", id)))?;
    Ok(Json(DocumentResponse {
        success: true,
        document,
    }))
}

pub async fn update_document_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let document = state
        .documents
        .update_status(id, req.status)
        .await?
        .ok_or_else(|| not_found_error(format!("Document {} not found", id)))?;
    Ok(Json(DocumentResponse {
        success: true,
        document,
    }))
}

pub async fn delete_document(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.documents.delete(id).await {
        return Err(not_found_error(format!("Document {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Documents attached to one loan, optionally narrowed by pipeline status
pub async fn list_loan_documents(
    State(state): State<SharedState>,
    Path(loan_id): Path<Uuid>,
    Query(q): Query<DocumentListQuery>,
) -> Json<DocumentListResponse> {
    let documents = state.documents.list_for_loan(loan_id, q.status).await;
    Json(DocumentListResponse {
        success: true,
        documents,
    })
}

pub async fn document_summary(State(state): State<SharedState>) -> Json<DocumentSummaryResponse> {
    Json(DocumentSummaryResponse {
        success: true,
        summary: state.documents.summary().await,
    })
}
