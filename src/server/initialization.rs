// src/server/initialization.rs

//! Handles the complete server initialization process: storage, the asset
//! broker, ban list, the match registry, and the listening socket.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload};

use crate::config::{Config, ModControl};
use crate::core::assets::broker::AssetBroker;
use crate::core::errors::EngineError;
use crate::core::match_engine::lifecycle::MatchConfig;
use crate::core::match_engine::warp::WarpMode;
use crate::core::registry::bans::BanList;
use crate::core::registry::discovery::MatchRegistry;
use crate::core::storage::adapter::{collections, StorageAdapter};
use crate::core::storage::file_store::FileStorageAdapter;

use super::context::ServerContext;

pub async fn setup(
    config: Config,
    log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let storage: Arc<dyn crate::core::storage::adapter::StorageAdapter> =
        Arc::new(FileStorageAdapter::open(&config.data_dir).await?);
    let asset_broker = Arc::new(AssetBroker::new(storage.clone()));
    let bans = Arc::new(BanList::new(storage.clone()));

    let mod_manifest = Arc::new(config.mod_manifest.clone());
    publish_mod_manifest(storage.as_ref(), &mod_manifest).await?;

    let registry = MatchRegistry::new(storage.clone(), asset_broker, bans);

    // The bundled reference server hosts exactly one match; a platform layer
    // fronting this engine would call `create_match` per lobby instead.
    let default_match_id = registry.create_match(MatchConfig {
        server_name: "Aetherlink Station".to_string(),
        password: None,
        max_players: config.default_max_players_per_match,
        tick_hz: config.tick_hz,
        warp_mode: WarpMode::Subspace,
        auto_promote_first_joiner: config.auto_promote_first_joiner,
        mod_control: config.mod_control,
        mod_manifest,
    });
    info!(match_id = %default_match_id, "default match started");

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Aetherlink engine listening on {}:{}", config.host, config.port);

    let connection_permits = Arc::new(tokio::sync::Semaphore::new(config.max_clients));

    Ok(ServerContext {
        config,
        registry,
        default_match_id,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        connection_permits,
        log_reload_handle,
    })
}

/// Publishes the mod-control manifest to `configuration:mod_control` (spec
/// §6, §9) so clients can self-validate before attempting to join, whatever
/// enforcement policy this server runs.
async fn publish_mod_manifest(storage: &dyn StorageAdapter, manifest: &ModControl) -> Result<()> {
    let bytes = serde_json::to_vec(manifest).map_err(EngineError::from)?;
    storage.put(collections::CONFIGURATION, "mod_control", bytes).await?;
    Ok(())
}

fn log_startup_info(config: &Config) {
    info!(
        tick_hz = config.tick_hz,
        max_clients = config.max_clients,
        data_dir = %config.data_dir,
        "starting aetherlink"
    );
}
