// src/core/match_engine/vessel_sync.rs

//! Vessel synchronization: rate limiting, anti-cheat checks, and tombstoned
//! removal (spec §4.7). Tombstone cleanup is the one structure in the match
//! engine touched from outside the tick thread (the registry's idle sweep),
//! so its "last swept at" stamp uses a CAS rather than `&mut self`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::core::opcode::Vector3;

const PROTO_LIMIT: usize = 5;
const PROTO_WINDOW: Duration = Duration::from_secs(60);
const UPDATE_MIN_INTERVAL: Duration = Duration::from_millis(20); // caps updates at 50/s
const TOMBSTONE_TTL: Duration = Duration::from_millis(2500);
const CLEANUP_THROTTLE: Duration = Duration::from_millis(500);
/// Maximum plausible per-update displacement before it is treated as a
/// teleport rather than physical motion, in meters.
const MAX_TELEPORT_DISTANCE: f64 = 50_000.0;

fn distance(a: &Vector3, b: &Vector3) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

fn vector_is_finite(v: &Vector3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntiCheatRejection {
    TooFrequent,
    Teleport,
    NonFinite,
}

/// Per-user sliding-window limiter for `VESSEL_PROTO` spawns.
#[derive(Debug, Default)]
pub struct ProtoRateLimiter {
    windows: IndexMap<String, VecDeque<Instant>>,
}

impl ProtoRateLimiter {
    pub fn check_and_record(&mut self, user_id: &str, now: Instant) -> bool {
        let window = self.windows.entry(user_id.to_string()).or_default();
        while let Some(&front) = window.front() {
            if now.duration_since(front) > PROTO_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= PROTO_LIMIT {
            return false;
        }
        window.push_back(now);
        true
    }
}

/// Per-vessel update throttle and anti-cheat state.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    last_accepted: IndexMap<Uuid, (Instant, Vector3)>,
}

impl UpdateGuard {
    /// Validates an incoming update against the rate limit and anti-cheat
    /// rules, recording it as the new baseline on success.
    pub fn validate(
        &mut self,
        vessel_id: Uuid,
        position: &Vector3,
        velocity: &Vector3,
        now: Instant,
    ) -> Result<(), AntiCheatRejection> {
        if !vector_is_finite(position) || !vector_is_finite(velocity) {
            return Err(AntiCheatRejection::NonFinite);
        }

        if let Some((last_time, last_pos)) = self.last_accepted.get(&vessel_id) {
            if now.duration_since(*last_time) < UPDATE_MIN_INTERVAL {
                return Err(AntiCheatRejection::TooFrequent);
            }
            if distance(last_pos, position) > MAX_TELEPORT_DISTANCE {
                return Err(AntiCheatRejection::Teleport);
            }
        }

        self.last_accepted.insert(vessel_id, (now, position.clone()));
        Ok(())
    }

    pub fn forget(&mut self, vessel_id: &Uuid) {
        self.last_accepted.shift_remove(vessel_id);
    }
}

/// Tombstones for recently-removed vessels, so a late `VESSEL_UPDATE` racing
/// the removal doesn't resurrect it. Entries expire after `TOMBSTONE_TTL`.
#[derive(Debug, Default)]
pub struct TombstoneSet {
    tombstones: IndexMap<Uuid, Instant>,
    last_swept_epoch_ms: AtomicI64,
}

impl TombstoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_removed(&mut self, vessel_id: Uuid, now: Instant) {
        self.tombstones.insert(vessel_id, now);
    }

    pub fn is_tombstoned(&self, vessel_id: &Uuid, now: Instant) -> bool {
        self.tombstones
            .get(vessel_id)
            .is_some_and(|&removed_at| now.duration_since(removed_at) < TOMBSTONE_TTL)
    }

    /// Sweeps expired tombstones, throttled to once per `CLEANUP_THROTTLE` via
    /// a CAS stamp so concurrent callers don't redundantly walk the map.
    pub fn sweep_if_due(&mut self, now: Instant, now_epoch_ms: i64) {
        let last = self.last_swept_epoch_ms.load(Ordering::Acquire);
        if now_epoch_ms - last < CLEANUP_THROTTLE.as_millis() as i64 {
            return;
        }
        if self
            .last_swept_epoch_ms
            .compare_exchange(last, now_epoch_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.tombstones
            .retain(|_, &mut removed_at| now.duration_since(removed_at) < TOMBSTONE_TTL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proto_limiter_allows_five_then_blocks() {
        let mut limiter = ProtoRateLimiter::default();
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_and_record("u1", now));
        }
        assert!(!limiter.check_and_record("u1", now));
    }

    #[test]
    fn update_guard_rejects_too_frequent_updates() {
        let mut guard = UpdateGuard::default();
        let id = Uuid::new_v4();
        let p = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
        let v = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
        let t0 = Instant::now();
        assert!(guard.validate(id, &p, &v, t0).is_ok());
        assert_eq!(
            guard.validate(id, &p, &v, t0 + Duration::from_millis(5)),
            Err(AntiCheatRejection::TooFrequent)
        );
    }

    #[test]
    fn update_guard_rejects_teleport() {
        let mut guard = UpdateGuard::default();
        let id = Uuid::new_v4();
        let p0 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
        let far = Vector3 { x: 1_000_000.0, y: 0.0, z: 0.0 };
        let v = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
        let t0 = Instant::now();
        guard.validate(id, &p0, &v, t0).unwrap();
        let result = guard.validate(id, &far, &v, t0 + Duration::from_millis(100));
        assert_eq!(result, Err(AntiCheatRejection::Teleport));
    }

    #[test]
    fn update_guard_rejects_non_finite_values() {
        let mut guard = UpdateGuard::default();
        let id = Uuid::new_v4();
        let bad = Vector3 { x: f64::NAN, y: 0.0, z: 0.0 };
        let v = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
        assert_eq!(guard.validate(id, &bad, &v, Instant::now()), Err(AntiCheatRejection::NonFinite));
    }

    #[test]
    fn tombstones_expire_after_ttl() {
        let mut set = TombstoneSet::new();
        let id = Uuid::new_v4();
        let t0 = Instant::now();
        set.mark_removed(id, t0);
        assert!(set.is_tombstoned(&id, t0 + Duration::from_millis(100)));
        assert!(!set.is_tombstoned(&id, t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn sweep_is_throttled() {
        let mut set = TombstoneSet::new();
        let id = Uuid::new_v4();
        let t0 = Instant::now();
        set.mark_removed(id, t0);
        set.sweep_if_due(t0 + Duration::from_secs(10), 10_000);
        assert!(!set.tombstones.contains_key(&id));
    }
}
