// src/core/errors.rs

//! Defines the primary error type for the match engine.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the engine.
/// Variants are behavioral categories (see spec §7), not raw error passthroughs.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("rate limited")]
    RateLimited,

    #[error("not found")]
    NotFound,

    #[error("lock held by {holder}")]
    LockConflict { holder: u64 },

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("server full")]
    ServerFull,

    #[error("invalid password")]
    InvalidPassword,

    #[error("banned: {0}")]
    Banned(String),

    #[error("mod-list incompatible: missing required {missing_required:?}, forbidden present {forbidden_present:?}")]
    ModIncompatible { missing_required: Vec<String>, forbidden_present: Vec<String> },
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Protocol(format!("malformed JSON payload: {e}"))
    }
}

impl From<uuid::Error> for EngineError {
    fn from(e: uuid::Error) -> Self {
        EngineError::Protocol(format!("malformed vessel id: {e}"))
    }
}

impl From<std::num::ParseIntError> for EngineError {
    fn from(_: std::num::ParseIntError) -> Self {
        EngineError::Protocol("expected an integer".into())
    }
}

impl From<bincode::error::EncodeError> for EngineError {
    fn from(e: bincode::error::EncodeError) -> Self {
        EngineError::Persistence(format!("encode failure: {e}"))
    }
}

impl From<bincode::error::DecodeError> for EngineError {
    fn from(e: bincode::error::DecodeError) -> Self {
        EngineError::Persistence(format!("decode failure: {e}"))
    }
}
