//! HTTP server setup and initialization
//!
//! ```text
//! browser ──GET /visits.js──→ script
//!         ──POST /api/visit──→ VisitStore::insert_visit
//! dashboard ──GET /api/visits/*──→ VisitsQuery
//!           ──DELETE /api/visits──→ VisitStore::delete_visit(s)
//! ```

pub mod api;
mod state;


pub use state::AppState;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    // The script may be embedded on any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let collect_path = state.tracking.endpoint.clone();

    Router::new()
        // Collection
        .route(&collect_path, post(api::record_visit))
        .route("/visits.js", get(api::client_script))
        .route("/health", get(api::health))
        // Listing and deletion
        .route(
            "/api/visits",
            get(api::list_visits).delete(api::delete_visits),
        )
        .route("/api/visits/:id", delete(api::delete_visit_by_path))
        // Analytics
        .route("/api/visits/stats", get(api::stats))
        .route("/api/visits/recent", get(api::recent_stats))
        .route("/api/visits/trend", get(api::trend_stats))
        .route("/api/visits/top-pages", get(api::top_pages))
        .route("/api/visits/referrers", get(api::referrer_stats))
        .route("/api/visits/aggregate", get(api::aggregate))
        .route("/api/visits/devices", get(api::device_stats))
        .route("/api/visits/os", get(api::os_stats))
        .route("/api/visits/browsers", get(api::browser_stats))
        .route("/api/visits/timezones", get(api::timezone_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown_rx` fires
pub async fn start_server(
    bind_addr: SocketAddr,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let app = router(state);

    tracing::info!("Starting server on {}", bind_addr);

    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}
