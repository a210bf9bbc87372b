//! Boardroom API - Loan Boarding Operations Core
//!
//! An in-process, multi-index entity store for the loan boarding pipeline:
//! loans, documents, exceptions, compliance events and agency commitments,
//! each reachable by primary id and by its declared secondary keys, with
//! best-effort mirroring into a full-text search index and a relationship
//! graph. The HTTP layer is a thin consumer; the stores are the product.

mod boarding;
mod commitment;
mod config;
mod error;
mod mirror;
mod routes;
mod state;
mod store;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Boardroom - Loan Boarding Operations Core...");

    // Load configuration
    let settings = Settings::load()?;
    info!(
        policy = ?settings.store.duplicate_key_policy,
        search_mirror = settings.mirrors.search_enabled,
        graph_mirror = settings.mirrors.graph_enabled,
        "📋 Configuration loaded"
    );

    // Wire up stores and mirror propagation
    let state = Arc::new(AppState::new(&settings));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Loans ───");
    info!("   POST   /api/loans                      - Create loan");
    info!("   GET    /api/loans                      - List (status/agency/date filters)");
    info!("   GET    /api/loans/summary              - Counts + recent loans");
    info!("   GET    /api/loans/by-number/{{ln}}       - Lookup by loan number");
    info!("   POST   /api/loans/{{id}}/status          - Change boarding status");
    info!("   GET    /api/loans/{{id}}/documents       - Documents for a loan");
    info!("   GET    /api/loans/{{id}}/exceptions      - Exceptions for a loan");
    info!("");
    info!("   ─── Documents / Exceptions / Compliance ───");
    info!("   POST   /api/documents                  - Attach document");
    info!("   POST   /api/documents/{{id}}/status      - Advance pipeline status");
    info!("   POST   /api/exceptions                 - Raise exception");
    info!("   DELETE /api/exceptions/{{id}}            - Reject (removes record)");
    info!("   POST   /api/compliance/events          - Record compliance event");
    info!("");
    info!("   ─── Commitments ───");
    info!("   POST   /api/commitments                - Stage from agency upload");
    info!("   GET    /api/commitments/lookup         - By commitmentId or loanNumber");
    info!("   DELETE /api/commitments/staged         - Clear staging area");
    info!("");
    info!("   ─── Search (mirror-backed) ───");
    info!("   GET    /api/search?q=...               - Full-text over mirrored fields");
    info!("   GET    /api/mirrors/stats              - Mirror backend sizes");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,boardroom_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
