// src/core/storage/file_store.rs

//! A file-backed `StorageAdapter`: one bincode-encoded snapshot file per
//! collection under a configured data directory. Grounded in the teacher's
//! whole-keyspace SPLDB snapshot strategy, narrowed from "the entire
//! keyspace in one file" to "one file per collection" since collections
//! here are independently sized and independently hot (vessel saves churn
//! far more than the admin list).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::errors::EngineError;

use super::adapter::{StorageAdapter, StoredItem};

type Collection = IndexMap<String, Vec<u8>>;

struct CollectionFile {
    path: PathBuf,
    entries: Mutex<Collection>,
}

pub struct FileStorageAdapter {
    data_dir: PathBuf,
    collections: dashmap::DashMap<String, CollectionFile>,
}

impl FileStorageAdapter {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(Self { data_dir, collections: dashmap::DashMap::new() })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.bincode"))
    }

    async fn load_collection(&self, collection: &str) -> Result<(), EngineError> {
        if self.collections.contains_key(collection) {
            return Ok(());
        }
        let path = self.collection_path(collection);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => bincode::serde::decode_from_slice::<Collection, _>(&bytes, bincode::config::standard())
                .map(|(value, _)| value)
                .unwrap_or_else(|err| {
                    warn!(collection, %err, "discarding unreadable collection snapshot");
                    IndexMap::new()
                }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(err) => return Err(err.into()),
        };
        self.collections
            .entry(collection.to_string())
            .or_insert_with(|| CollectionFile { path, entries: Mutex::new(entries) });
        Ok(())
    }

    async fn flush(&self, collection: &str, entries: &Collection) -> Result<(), EngineError> {
        let path = self.collection_path(collection);
        let bytes = bincode::serde::encode_to_vec(entries, bincode::config::standard())
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        let tmp_path = path.with_extension("bincode.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!(collection, bytes = bytes.len(), "flushed collection snapshot");
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for FileStorageAdapter {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        self.load_collection(collection).await?;
        let entry = self.collections.get(collection).expect("just loaded");
        let entries = entry.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), EngineError> {
        self.load_collection(collection).await?;
        let entry = self.collections.get(collection).expect("just loaded");
        let mut entries = entry.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(collection, &entries).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), EngineError> {
        self.load_collection(collection).await?;
        let entry = self.collections.get(collection).expect("just loaded");
        let mut entries = entry.entries.lock().await;
        entries.shift_remove(key);
        self.flush(collection, &entries).await
    }

    async fn list_prefixed(&self, collection: &str, prefix: &str) -> Result<Vec<StoredItem>, EngineError> {
        self.load_collection(collection).await?;
        let entry = self.collections.get(collection).expect("just loaded");
        let entries = entry.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| StoredItem { key: k.clone(), value: v.clone() })
            .collect())
    }
}
