// src/core/match_engine/chat_progress.rs

//! Chat rate limiting and the shared scenario/career-progress state (spec
//! §4.8): science, funds, reputation, and the opaque tech-tree/contract/
//! facility blobs that ride alongside them.

use std::time::{Duration, Instant};

use bytes::Bytes;
use indexmap::IndexMap;

const CHAT_MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct ChatLimiter {
    last_message_at: IndexMap<u64, Instant>,
}

impl ChatLimiter {
    pub fn allow(&mut self, session_id: u64, now: Instant) -> bool {
        match self.last_message_at.get(&session_id) {
            Some(&last) if now.duration_since(last) < CHAT_MIN_INTERVAL => false,
            _ => {
                self.last_message_at.insert(session_id, now);
                true
            }
        }
    }

    pub fn forget(&mut self, session_id: u64) {
        self.last_message_at.shift_remove(&session_id);
    }
}

/// Shared career progress, replicated to every player on change (spec §4.8).
/// `tech_tree`/`contracts`/`facilities` are opaque blobs the server stores
/// and relays but never parses, keyed by the client-supplied module name.
#[derive(Debug, Default, Clone)]
pub struct ScenarioState {
    pub science: f64,
    pub funds: f64,
    pub reputation: f64,
    pub modules: IndexMap<String, Bytes>,
}

impl ScenarioState {
    pub fn apply_delta(&mut self, science: Option<f64>, funds: Option<f64>, reputation: Option<f64>) {
        if let Some(d) = science {
            self.science += d;
        }
        if let Some(d) = funds {
            self.funds += d;
        }
        if let Some(d) = reputation {
            self.reputation += d;
        }
    }

    pub fn set_module(&mut self, name: String, data: Bytes) {
        self.modules.insert(name, data);
    }
}
