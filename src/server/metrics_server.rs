// src/server/metrics_server.rs

use std::net::SocketAddr;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::core::metrics::gather_metrics;

async fn metrics_handler() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], gather_metrics())
}

/// Runs a simple HTTP server exposing Prometheus metrics on `/metrics`.
pub async fn run_metrics_server(port: u16, mut shutdown_rx: broadcast::Receiver<()>) {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("metrics server listening on http://{addr}/metrics");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind metrics server on port {port}: {e}");
            return;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.recv().await.ok();
            info!("metrics server shutting down");
        })
        .await
        .unwrap();
}
