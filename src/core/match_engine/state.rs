// src/core/match_engine/state.rs

//! `MatchState`: the complete authoritative state of one match (spec §3),
//! owned exclusively by that match's tick thread (spec §5).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::core::assets::kind::AssetUploadLimiter;

use super::admin::AdminState;
use super::chat_progress::{ChatLimiter, ScenarioState};
use super::kerbal::Kerbal;
use super::lock_manager::LockManager;
use super::player::Player;
use super::vessel::Vessel;
use super::vessel_sync::{ProtoRateLimiter, TombstoneSet, UpdateGuard};
use super::warp::{WarpMode, WarpState};

/// The shape persisted to the `match_saves` collection on a save tick or
/// shutdown (spec §6). Deliberately narrower than a `HANDSHAKE`: players and
/// locks are connection-scoped and never survive a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSave {
    pub vessels: Vec<Vessel>,
    pub kerbals: Vec<Kerbal>,
    pub science: f64,
    pub funds: f64,
    pub reputation: f64,
    pub universe_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum GameMode {
    Sandbox,
    Science,
    Career,
}

pub struct MatchState {
    pub match_id: Uuid,
    pub server_name: String,
    pub password: Option<String>,
    pub game_mode: GameMode,
    pub max_players: usize,
    pub tick_count: u64,
    pub tick_hz: u32,

    pub players: IndexMap<u64, Player>,
    pub vessels: IndexMap<Uuid, Vessel>,
    pub kerbals: IndexMap<String, Kerbal>,

    pub warp: WarpState,
    pub locks: LockManager,
    pub scenario: ScenarioState,
    pub admin: AdminState,

    pub chat_limiter: ChatLimiter,
    pub proto_limiter: ProtoRateLimiter,
    pub update_guard: UpdateGuard,
    pub tombstones: TombstoneSet,
    pub asset_upload_limiter: AssetUploadLimiter,

    /// Set once three consecutive ticks overrun their budget (spec §5); while
    /// true the tick loop skips non-essential broadcast work to catch up.
    pub degraded: bool,
    pub consecutive_slow_ticks: u32,
}

impl MatchState {
    pub fn new(
        match_id: Uuid,
        server_name: String,
        password: Option<String>,
        game_mode: GameMode,
        max_players: usize,
        tick_hz: u32,
        warp_mode: WarpMode,
        admin: AdminState,
    ) -> Self {
        Self {
            match_id,
            server_name,
            password,
            game_mode,
            max_players,
            tick_count: 0,
            tick_hz,
            players: IndexMap::new(),
            vessels: IndexMap::new(),
            kerbals: IndexMap::new(),
            warp: WarpState::new(warp_mode, 0.0),
            locks: LockManager::new(),
            scenario: ScenarioState::default(),
            admin,
            chat_limiter: ChatLimiter::default(),
            proto_limiter: ProtoRateLimiter::default(),
            update_guard: UpdateGuard::default(),
            tombstones: TombstoneSet::new(),
            asset_upload_limiter: AssetUploadLimiter::default(),
            degraded: false,
            consecutive_slow_ticks: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn requires_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn check_password(&self, supplied: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => supplied.is_some_and(|s| s == expected),
        }
    }

    pub fn join(&mut self, player: Player) {
        self.warp.join(player.session_id);
        self.players.insert(player.session_id, player);
    }

    /// Removes a player and every lock/limiter entry tied to their session,
    /// returning the lock-release events to broadcast.
    pub fn leave(&mut self, session_id: u64) -> Vec<super::lock_manager::LockEvent> {
        self.players.shift_remove(&session_id);
        self.warp.leave(session_id);
        self.chat_limiter.forget(session_id);
        self.locks.release_all_for_session(session_id)
    }

    /// The public listing snapshot for the external discovery registry (spec
    /// §6): player count, mode, password-protection flag, never the password
    /// itself.
    pub fn label(&self) -> serde_json::Value {
        json!({
            "match_id": self.match_id,
            "server_name": self.server_name,
            "player_count": self.players.len(),
            "max_players": self.max_players,
            "password_protected": self.requires_password(),
            "warp_mode": match self.warp.mode {
                WarpMode::Subspace => "subspace",
                WarpMode::Mcu => "mcu",
                WarpMode::Admin => "admin",
            },
        })
    }

    /// A full-state snapshot sent to a newly joined player as their
    /// `HANDSHAKE` response (spec §4.3): server info, then the player,
    /// vessel, kerbal, and lock lists in that order.
    pub fn handshake_snapshot(&self) -> serde_json::Value {
        json!({
            "match_id": self.match_id,
            "server_name": self.server_name,
            "universe_time": self.warp.universe_time(),
            "tick_count": self.tick_count,
            "science": self.scenario.science,
            "funds": self.scenario.funds,
            "reputation": self.scenario.reputation,
            "players": self.players.values().map(player_json).collect::<Vec<_>>(),
            "vessels": self.vessels.values().collect::<Vec<_>>(),
            "kerbals": self.kerbals.values().collect::<Vec<_>>(),
            "locks": self.locks.snapshot(),
        })
    }

    /// The state persisted on a save tick or shutdown (spec §6).
    pub fn save(&self) -> MatchSave {
        MatchSave {
            vessels: self.vessels.values().cloned().collect(),
            kerbals: self.kerbals.values().cloned().collect(),
            science: self.scenario.science,
            funds: self.scenario.funds,
            reputation: self.scenario.reputation,
            universe_time: self.warp.universe_time(),
        }
    }
}

/// `Player` carries a non-serializable `Instant`, so the handshake player
/// list is built field-by-field rather than via a blanket derive.
fn player_json(p: &Player) -> serde_json::Value {
    json!({
        "session_id": p.session_id,
        "user_id": p.user_id,
        "username": p.username,
        "color": p.color,
        "status": p.status,
        "controlled_vessel": p.controlled_vessel,
        "subspace_id": p.subspace_id,
        "warp_rate": p.warp_rate,
    })
}
