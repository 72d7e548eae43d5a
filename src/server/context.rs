// src/server/context.rs

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing_subscriber::{filter::EnvFilter, reload};
use uuid::Uuid;

use crate::config::Config;
use crate::core::registry::discovery::MatchRegistry;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub config: Config,
    pub registry: MatchRegistry,
    pub default_match_id: Uuid,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
    pub connection_permits: Arc<tokio::sync::Semaphore>,
    pub log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
}
