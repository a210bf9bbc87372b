//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Handlers stay thin: they parse
//! the request, call the store, and shape the JSON envelope. Validation and
//! business decisions belong to the upstream pipeline, not here.

mod commitments;
mod compliance;
mod documents;
mod exceptions;
mod loans;
mod search;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Loans
        .route("/api/loans", post(loans::create_loan).get(loans::list_loans))
        .route("/api/loans/summary", get(loans::loan_summary))
        .route("/api/loans/by-number/{loan_number}", get(loans::get_loan_by_number))
        .route(
            "/api/loans/{id}",
            get(loans::get_loan)
                .patch(loans::update_loan)
                .delete(loans::delete_loan),
        )
        .route("/api/loans/{id}/status", post(loans::update_loan_status))
        .route("/api/loans/{id}/documents", get(documents::list_loan_documents))
        .route("/api/loans/{id}/exceptions", get(exceptions::list_loan_exceptions))
        // Documents
        .route(
            "/api/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route("/api/documents/summary", get(documents::document_summary))
        .route(
            "/api/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/api/documents/{id}/status", post(documents::update_document_status))
        // Exceptions
        .route(
            "/api/exceptions",
            post(exceptions::create_exception).get(exceptions::list_exceptions),
        )
        .route("/api/exceptions/summary", get(exceptions::exception_summary))
        .route("/api/exceptions/{id}/acknowledge", post(exceptions::acknowledge_exception))
        .route("/api/exceptions/{id}/resolve", post(exceptions::resolve_exception))
        .route(
            "/api/exceptions/{id}",
            get(exceptions::get_exception).delete(exceptions::reject_exception),
        )
        // Compliance events
        .route(
            "/api/compliance/events",
            post(compliance::record_event).get(compliance::list_events),
        )
        .route("/api/compliance/summary", get(compliance::compliance_summary))
        .route("/api/compliance/events/{id}", get(compliance::get_event))
        .route("/api/compliance/events/{id}/review", post(compliance::review_event))
        // Commitments
        .route(
            "/api/commitments",
            post(commitments::stage_commitment).get(commitments::list_commitments),
        )
        .route("/api/commitments/summary", get(commitments::commitment_summary))
        .route("/api/commitments/lookup", get(commitments::lookup_commitment))
        .route("/api/commitments/active", get(commitments::list_active_commitments))
        .route("/api/commitments/staged", delete(commitments::clear_staged))
        .route(
            "/api/commitments/{id}",
            get(commitments::get_commitment).delete(commitments::delete_commitment),
        )
        .route("/api/commitments/{id}/status", post(commitments::update_commitment_status))
        // Full-text search (served from the mirror; degrades when disabled)
        .route("/api/search", get(search::search))
        .route("/api/mirrors/stats", get(search::mirror_stats))
        .layer(middleware)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
