//! HTTP introspection endpoint for the tracker.
//!
//! # Routes
//! - `GET /debug/httpclients`: JSON report of in-flight requests
//! - `GET /debug/httpclients/text`: text report
//! - `GET /debug/status`: tracker status

pub mod handlers;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::tracker::HttpTracker;
use self::handlers::*;

pub fn router(tracker: HttpTracker) -> Router {
    Router::new()
        .route("/debug/httpclients", get(get_inflight))
        .route("/debug/httpclients/text", get(get_inflight_text))
        .route("/debug/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(tracker)
}

/// Serve the introspection endpoint until shutdown is broadcast.
pub async fn serve(
    listener: TcpListener,
    tracker: HttpTracker,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin endpoint starting");

    axum::serve(listener, router(tracker))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin endpoint stopped");
    Ok(())
}
