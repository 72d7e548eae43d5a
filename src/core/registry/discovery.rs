// src/core/registry/discovery.rs

//! The external discovery registry (spec §6): `list_matches`/`create_match`
//! as plain async functions over an in-process map of running matches. The
//! match's wire transport is out of this crate's authority (spec §1); this
//! registry is the reference realization used by the bundled server.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::assets::broker::AssetBroker;
use crate::core::errors::EngineError;
use crate::core::storage::adapter::StorageAdapter;

use super::bans::BanList;
use crate::core::match_engine::lifecycle::{ControlMessage, MatchActor, MatchConfig, MatchHandle};

#[derive(Clone)]
pub struct MatchRegistry {
    matches: Arc<DashMap<Uuid, MatchHandle>>,
    storage: Arc<dyn StorageAdapter>,
    asset_broker: Arc<AssetBroker>,
    bans: Arc<BanList>,
}

impl MatchRegistry {
    pub fn new(storage: Arc<dyn StorageAdapter>, asset_broker: Arc<AssetBroker>, bans: Arc<BanList>) -> Self {
        Self { matches: Arc::new(DashMap::new()), storage, asset_broker, bans }
    }

    pub fn create_match(&self, config: MatchConfig) -> Uuid {
        let handle = MatchActor::spawn(config, self.storage.clone(), self.asset_broker.clone(), self.bans.clone());
        let match_id = handle.match_id;
        self.matches.insert(match_id, handle);
        match_id
    }

    pub fn list_matches(&self) -> Vec<serde_json::Value> {
        self.matches.iter().map(|entry| entry.value().label.borrow().clone()).collect()
    }

    pub fn get(&self, match_id: Uuid) -> Option<MatchHandle> {
        self.matches.get(&match_id).map(|entry| MatchHandle {
            match_id: entry.match_id,
            inbox: entry.inbox.clone(),
            control: entry.control.clone(),
            label: entry.label.clone(),
        })
    }

    pub async fn shutdown_match(&self, match_id: Uuid) -> Result<(), EngineError> {
        if let Some((_, handle)) = self.matches.remove(&match_id) {
            let _ = handle.control.send(ControlMessage::Shutdown).await;
        }
        Ok(())
    }

    pub async fn shutdown_all(&self) {
        let ids: Vec<Uuid> = self.matches.iter().map(|e| *e.key()).collect();
        for id in ids {
            let _ = self.shutdown_match(id).await;
        }
    }
}

/// A channel the connection layer uses to push decoded frames into a match.
pub type Inbox = mpsc::Sender<crate::core::match_engine::lifecycle::Envelope>;
