// src/core/storage/adapter.rs

//! The `StorageAdapter` trait (spec §6): a collection-keyed key/value
//! interface that every persistence concern (match saves, LMP groups,
//! crafts, screenshots, flags, bans, admins, configuration) goes through.
//! This indirection is what lets a test harness swap in an in-memory
//! implementation without touching the rest of the engine.

use async_trait::async_trait;

use crate::core::errors::EngineError;

/// The fixed set of collections a `StorageAdapter` must support (spec §6).
/// Kept as string constants rather than an enum so new collections can be
/// added without a breaking change to the trait.
pub mod collections {
    pub const MATCH_SAVES: &str = "match_saves";
    pub const LMP_DATA: &str = "lmp_data";
    pub const CRAFTS: &str = "crafts";
    pub const SCREENSHOTS: &str = "screenshots";
    pub const FLAGS: &str = "flags";
    pub const BANS: &str = "bans";
    pub const ADMINS: &str = "admins";
    pub const CONFIGURATION: &str = "configuration";
}

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub key: String,
    pub value: Vec<u8>,
}

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, EngineError>;

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), EngineError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), EngineError>;

    /// Lists every key in `collection` whose key starts with `prefix`,
    /// ordered oldest-inserted first. Used by the asset broker's
    /// oldest-first quota eviction.
    async fn list_prefixed(&self, collection: &str, prefix: &str) -> Result<Vec<StoredItem>, EngineError>;
}
