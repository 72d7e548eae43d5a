// src/core/match_engine/player.rs

//! The `Player` entity (spec §3): keyed by `session_id`, linked to a stable
//! `user_id` across reconnects.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Connecting,
    Loading,
    Connected,
    InFlight,
    Idle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PlayerColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// A connected player. Invariant: `players[session_id].session_id == session_id`,
/// enforced by always indexing the owning map by `session_id`.
#[derive(Debug, Clone)]
pub struct Player {
    pub session_id: u64,
    pub user_id: String,
    pub username: String,
    pub color: PlayerColor,
    pub status: PlayerStatus,
    pub controlled_vessel: Option<Uuid>,
    pub subspace_id: i64,
    pub warp_rate: f64,
    #[allow(dead_code)]
    pub last_activity: Instant,
}

impl Player {
    pub fn new(session_id: u64, user_id: String, username: String, subspace_id: i64) -> Self {
        Self {
            session_id,
            user_id,
            username,
            color: PlayerColor::default(),
            status: PlayerStatus::Connecting,
            controlled_vessel: None,
            subspace_id,
            warp_rate: 1.0,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }
}
