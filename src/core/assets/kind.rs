// src/core/assets/kind.rs

//! The three asset kinds the broker manages (spec §4.10), each with its own
//! quota and storage collection.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::opcode::codes;

lazy_static! {
    /// Flag names: letters, digits, `-`, `_`, `/` only (spec §4.9). The
    /// charset excludes `.`, so path-traversal segments can't appear either.
    static ref FLAG_NAME_PATTERN: Regex = Regex::new(r"^[-_a-zA-Z0-9/]+$").unwrap();
}

/// Validates a flag asset name against spec §4.9's naming rule. Craft and
/// screenshot names carry no such restriction.
pub fn is_valid_flag_name(name: &str) -> bool {
    FLAG_NAME_PATTERN.is_match(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Craft,
    Screenshot,
    Flag,
}

impl AssetKind {
    pub fn collection(self) -> &'static str {
        match self {
            AssetKind::Craft => "crafts",
            AssetKind::Screenshot => "screenshots",
            AssetKind::Flag => "flags",
        }
    }

    /// The wire opcode server responses for this kind are framed under.
    pub fn opcode(self) -> u16 {
        match self {
            AssetKind::Craft => codes::CRAFT,
            AssetKind::Screenshot => codes::SCREENSHOT,
            AssetKind::Flag => codes::FLAG,
        }
    }

    /// Maximum stored items per (user, folder) pair before the oldest is
    /// evicted to make room (spec §4.10).
    pub fn quota_per_folder(self) -> usize {
        match self {
            AssetKind::Craft => 64,
            AssetKind::Screenshot => 200,
            AssetKind::Flag => 32,
        }
    }

    pub fn max_folders_per_user(self) -> usize {
        match self {
            AssetKind::Craft => 16,
            AssetKind::Screenshot => 16,
            AssetKind::Flag => 4,
        }
    }

    /// Minimum time between uploads by the same user for this kind, per
    /// spec §4.9. Flags carry no per-user upload cooldown.
    pub fn upload_cooldown(self) -> Option<Duration> {
        match self {
            AssetKind::Craft => Some(Duration::from_secs(5)),
            AssetKind::Screenshot => Some(Duration::from_secs(15)),
            AssetKind::Flag => None,
        }
    }
}

/// Per-(kind, user) upload cooldown, checked synchronously in the router
/// before the async broker call is even scheduled.
#[derive(Debug, Default)]
pub struct AssetUploadLimiter {
    last_upload: IndexMap<(AssetKind, String), Instant>,
}

impl AssetUploadLimiter {
    pub fn check_and_record(&mut self, kind: AssetKind, user_id: &str, now: Instant) -> bool {
        let Some(cooldown) = kind.upload_cooldown() else {
            return true;
        };
        let key = (kind, user_id.to_string());
        if let Some(&last) = self.last_upload.get(&key) {
            if now.duration_since(last) < cooldown {
                return false;
            }
        }
        self.last_upload.insert(key, now);
        true
    }
}
