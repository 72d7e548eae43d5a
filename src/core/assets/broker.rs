// src/core/assets/broker.rs

//! The asset broker (spec §4.10): upload/download/list/delete for crafts,
//! screenshots, and flags, with per-kind quotas and CRC32 integrity checks.
//! Full craft validation (part counts, mod compatibility) is explicitly out
//! of scope; only byte-level integrity is checked here.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use crc::{CRC_32_ISO_HDLC, Crc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::EngineError;
use crate::core::storage::adapter::StorageAdapter;

use super::kind::AssetKind;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAsset {
    pub name: String,
    pub folder: String,
    pub owner: String,
    /// Raw, decoded bytes; never base64 in storage, only on the wire.
    pub data: Vec<u8>,
    pub crc32: u32,
    pub uploaded_at_unix_ms: u64,
}

pub struct AssetBroker {
    storage: Arc<dyn StorageAdapter>,
}

fn now_unix_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn asset_key(owner: &str, folder: &str, name: &str) -> String {
    format!("{owner}/{folder}/{name}")
}

fn folder_prefix(owner: &str, folder: &str) -> String {
    format!("{owner}/{folder}/")
}

fn owner_prefix(owner: &str) -> String {
    format!("{owner}/")
}

impl AssetBroker {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Decodes, checksums, and stores an upload, evicting the oldest item in
    /// the same folder if the per-folder quota is exceeded.
    pub async fn upload(
        &self,
        kind: AssetKind,
        owner: &str,
        folder: &str,
        name: &str,
        data_b64: &str,
    ) -> Result<u32, EngineError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(data_b64)
            .map_err(|e| EngineError::Protocol(format!("invalid base64 asset payload: {e}")))?;
        let crc32 = CRC32.checksum(&data);

        self.enforce_folder_cap(kind, owner, folder).await?;
        self.enforce_quota(kind, owner, folder).await?;

        let asset = StoredAsset {
            name: name.to_string(),
            folder: folder.to_string(),
            owner: owner.to_string(),
            data,
            crc32,
            uploaded_at_unix_ms: now_unix_ms(),
        };
        let encoded = bincode::serde::encode_to_vec(&asset, bincode::config::standard())
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        self.storage
            .put(kind.collection(), &asset_key(owner, folder, name), encoded)
            .await?;
        info!(owner, folder, name, crc32, "asset uploaded");
        Ok(crc32)
    }

    pub async fn download(&self, kind: AssetKind, owner: &str, folder: &str, name: &str) -> Result<Option<StoredAsset>, EngineError> {
        let raw = self.storage.get(kind.collection(), &asset_key(owner, folder, name)).await?;
        let Some(raw) = raw else { return Ok(None) };
        let (asset, _) = bincode::serde::decode_from_slice(&raw, bincode::config::standard())
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(Some(asset))
    }

    pub async fn delete(&self, kind: AssetKind, owner: &str, folder: &str, name: &str) -> Result<(), EngineError> {
        self.storage.delete(kind.collection(), &asset_key(owner, folder, name)).await
    }

    pub async fn list_folder(&self, kind: AssetKind, owner: &str, folder: &str) -> Result<Vec<String>, EngineError> {
        let items = self.storage.list_prefixed(kind.collection(), &folder_prefix(owner, folder)).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.key.rsplit('/').next().map(|s| s.to_string()))
            .collect())
    }

    /// Caps the number of distinct folders a user holds for this asset kind
    /// (spec §4.9's per-user folder quota), evicting the oldest folder in its
    /// entirety once a genuinely new folder would exceed it.
    async fn enforce_folder_cap(&self, kind: AssetKind, owner: &str, folder: &str) -> Result<(), EngineError> {
        let items = self.storage.list_prefixed(kind.collection(), &owner_prefix(owner)).await?;
        let prefix = owner_prefix(owner);
        let mut folders: Vec<String> = Vec::new();
        for item in &items {
            let rest = item.key.strip_prefix(prefix.as_str()).unwrap_or(&item.key);
            if let Some(name) = rest.split('/').next() {
                if !folders.iter().any(|f| f == name) {
                    folders.push(name.to_string());
                }
            }
        }

        if folders.iter().any(|f| f == folder) || folders.len() < kind.max_folders_per_user() {
            return Ok(());
        }

        if let Some(oldest_folder) = folders.first() {
            let doomed = self.storage.list_prefixed(kind.collection(), &folder_prefix(owner, oldest_folder)).await?;
            for item in doomed {
                self.storage.delete(kind.collection(), &item.key).await?;
            }
            info!(owner, folder = oldest_folder.as_str(), "evicted oldest folder to respect per-user folder quota");
        }
        Ok(())
    }

    async fn enforce_quota(&self, kind: AssetKind, owner: &str, folder: &str) -> Result<(), EngineError> {
        let items = self.storage.list_prefixed(kind.collection(), &folder_prefix(owner, folder)).await?;
        if items.len() < kind.quota_per_folder() {
            return Ok(());
        }
        // `list_prefixed` returns oldest-inserted first; evict the front.
        if let Some(oldest) = items.first() {
            self.storage.delete(kind.collection(), &oldest.key).await?;
            info!(owner, folder, key = oldest.key, "evicted oldest asset to respect folder quota");
        }
        Ok(())
    }
}
