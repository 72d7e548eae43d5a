// src/core/registry/bans.rs

//! Global ban list, persisted through the storage adapter's `bans`
//! collection (spec §6) so a ban survives a match restart and applies
//! across every match the same server hosts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::EngineError;
use crate::core::storage::adapter::{StorageAdapter, collections};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    pub user_id: String,
    pub reason: String,
    pub banned_by: String,
    pub banned_at_unix_ms: u64,
}

pub struct BanList {
    storage: Arc<dyn StorageAdapter>,
}

impl BanList {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub async fn is_banned(&self, user_id: &str) -> Result<bool, EngineError> {
        Ok(self.storage.get(collections::BANS, user_id).await?.is_some())
    }

    pub async fn ban(&self, record: BanRecord) -> Result<(), EngineError> {
        let encoded = bincode::serde::encode_to_vec(&record, bincode::config::standard())
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        self.storage.put(collections::BANS, &record.user_id, encoded).await
    }

    pub async fn unban(&self, user_id: &str) -> Result<(), EngineError> {
        self.storage.delete(collections::BANS, user_id).await
    }
}
