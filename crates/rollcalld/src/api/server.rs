//! HTTP server setup and routing.

use crate::geocode::Geocoder;
use crate::session::CameraSession;
use crate::workflow::CaptureWorkflow;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use rollcall_core::types::FaceVerifier;
use rollcall_store::{AttendanceLedger, Gallery};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

/// Shared application context passed to all handlers.
#[derive(Clone)]
pub struct AppContext {
    pub session: CameraSession,
    pub gallery: Gallery,
    /// Serialized writer access to the ledger's read-then-rewrite cycle.
    pub ledger: Arc<Mutex<AttendanceLedger>>,
    pub verifier: Arc<Mutex<Box<dyn FaceVerifier + Send>>>,
    pub geocoder: Arc<dyn Geocoder>,
    pub workflow: Arc<CaptureWorkflow>,
}

/// Build the application router.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(super::handlers::index))
        .route("/video_feed", get(super::stream::video_feed))
        .route("/capture", post(super::handlers::capture))
        .route("/upload", post(super::handlers::upload))
        .route("/shutdown", post(super::handlers::shutdown))
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the shutdown signal fires.
pub async fn run(port: u16, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Graceful shutdown signal handler.
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
            tracing::info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}
