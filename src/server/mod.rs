// src/server/mod.rs

//! Wires together initialization, background tasks, and the accept loop.

mod connection_loop;
pub mod context;
mod initialization;
mod metrics_server;
mod spawner;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{filter::EnvFilter, reload};

use crate::config::Config;

pub async fn run(
    config: Config,
    log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
) -> Result<()> {
    let mut ctx = initialization::setup(config, log_reload_handle).await?;
    spawner::spawn_background_tasks(&mut ctx);
    connection_loop::run(ctx).await;
    Ok(())
}
