// src/core/match_engine/warp.rs

//! The warp subsystem (spec §4.6): three mutually exclusive modes governing
//! how `universe_time` advances relative to wall-clock time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpMode {
    /// Each player warps independently inside their own time bubble; players
    /// in different subspaces cannot interact with shared vessels.
    Subspace,
    /// "Master clock unification": the whole match shares one universe time,
    /// advancing at the slowest-warping player's rate.
    Mcu,
    /// An admin pins the rate directly; player input is ignored.
    Admin,
}

#[derive(Debug, Clone)]
pub struct Subspace {
    pub id: i64,
    pub universe_time: f64,
}

#[derive(Debug)]
pub struct WarpState {
    pub mode: WarpMode,
    subspaces: IndexMap<i64, Subspace>,
    player_subspace: IndexMap<u64, i64>,
    player_rate: IndexMap<u64, f64>,
    next_subspace_id: i64,
    admin_rate: f64,
}

impl WarpState {
    pub fn new(mode: WarpMode, initial_universe_time: f64) -> Self {
        let mut subspaces = IndexMap::new();
        subspaces.insert(0, Subspace { id: 0, universe_time: initial_universe_time });
        Self {
            mode,
            subspaces,
            player_subspace: IndexMap::new(),
            player_rate: IndexMap::new(),
            next_subspace_id: 1,
            admin_rate: 1.0,
        }
    }

    pub fn universe_time(&self) -> f64 {
        self.subspaces.get(&0).map(|s| s.universe_time).unwrap_or(0.0)
    }

    pub fn subspace_of(&self, session_id: u64) -> i64 {
        *self.player_subspace.get(&session_id).unwrap_or(&0)
    }

    /// Every session currently warping in `subspace_id`, for targeting a
    /// time-sync broadcast at only the players who share it.
    pub fn sessions_in_subspace(&self, subspace_id: i64) -> Vec<u64> {
        self.player_subspace
            .iter()
            .filter(|(_, s)| **s == subspace_id)
            .map(|(session, _)| *session)
            .collect()
    }

    pub fn join(&mut self, session_id: u64) {
        self.player_subspace.entry(session_id).or_insert(0);
        self.player_rate.entry(session_id).or_insert(1.0);
    }

    pub fn leave(&mut self, session_id: u64) {
        self.player_subspace.shift_remove(&session_id);
        self.player_rate.shift_remove(&session_id);
    }

    pub fn set_rate(&mut self, session_id: u64, rate: f64) {
        self.player_rate.insert(session_id, rate.max(0.0));
    }

    pub fn set_admin_rate(&mut self, rate: f64) {
        self.admin_rate = rate.max(0.0);
    }

    /// Creates (or finds) a fresh subspace for a player warping alone, returning
    /// its id. Only meaningful in `Subspace` mode.
    pub fn enter_new_subspace(&mut self, session_id: u64, universe_time: f64) -> i64 {
        let id = self.next_subspace_id;
        self.next_subspace_id += 1;
        self.subspaces.insert(id, Subspace { id, universe_time });
        self.player_subspace.insert(session_id, id);
        id
    }

    pub fn rejoin_subspace(&mut self, session_id: u64, subspace_id: i64) {
        if self.subspaces.contains_key(&subspace_id) {
            self.player_subspace.insert(session_id, subspace_id);
        }
    }

    /// Advances time by `dt` wall-clock seconds, per the active mode. Returns
    /// the (subspace_id, new universe_time) pairs that changed, for broadcast.
    pub fn advance(&mut self, dt: f64) -> Vec<(i64, f64)> {
        match self.mode {
            WarpMode::Subspace => {
                let rates = &self.player_rate;
                let mut per_subspace_rate: IndexMap<i64, f64> = IndexMap::new();
                for (session, subspace) in &self.player_subspace {
                    let rate = *rates.get(session).unwrap_or(&1.0);
                    let entry = per_subspace_rate.entry(*subspace).or_insert(1.0);
                    *entry = entry.max(rate);
                }
                let mut changed = Vec::new();
                for (id, subspace) in self.subspaces.iter_mut() {
                    let rate = per_subspace_rate.get(id).copied().unwrap_or(1.0);
                    subspace.universe_time += dt * rate;
                    changed.push((*id, subspace.universe_time));
                }
                changed
            }
            WarpMode::Mcu => {
                let slowest = self
                    .player_rate
                    .values()
                    .copied()
                    .fold(f64::INFINITY, f64::min);
                let rate = if slowest.is_finite() { slowest } else { 1.0 };
                let shared = self.subspaces.entry(0).or_insert(Subspace { id: 0, universe_time: 0.0 });
                shared.universe_time += dt * rate;
                vec![(0, shared.universe_time)]
            }
            WarpMode::Admin => {
                let shared = self.subspaces.entry(0).or_insert(Subspace { id: 0, universe_time: 0.0 });
                shared.universe_time += dt * self.admin_rate;
                vec![(0, shared.universe_time)]
            }
        }
    }
}
