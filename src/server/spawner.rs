// src/server/spawner.rs

//! Spawns the server's long-lived background tasks onto the context's
//! `JoinSet` so a panic or early exit in any of them surfaces during
//! shutdown instead of disappearing silently.

use tracing::info;

use super::context::ServerContext;
use super::metrics_server::run_metrics_server;

pub fn spawn_background_tasks(ctx: &mut ServerContext) {
    if ctx.config.metrics.enabled {
        let port = ctx.config.metrics.port;
        let shutdown_rx = ctx.shutdown_tx.subscribe();
        ctx.background_tasks.spawn(async move {
            run_metrics_server(port, shutdown_rx).await;
            Ok(())
        });
        info!(port, "metrics server task spawned");
    } else {
        info!("metrics server disabled");
    }
}
