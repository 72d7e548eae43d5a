// src/core/match_engine/lock_manager.rs

//! The lock manager (spec §4.5): mediates exclusive write access to vessels,
//! kerbals, and miscellaneous named resources.
//!
//! Eight lock kinds share one acquisition algorithm, but `Control` and
//! `Update`/`UnloadedUpdate` interact: a live `Control` holder may force an
//! `Update` acquisition against whoever currently holds it, but acquiring
//! `Control` itself never auto-grants `Update` — the client must ask for it
//! explicitly. A bare `Update` request against a vessel currently held only
//! as `UnloadedUpdate` bumps the background holder rather than being denied.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::opcode::LockKind;

/// What a lock is held against: a vessel, a named kerbal, or a free-form key
/// (used by `Contract` and `Misc` locks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockTarget {
    Vessel(uuid::Uuid),
    Kerbal(String),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LockKey {
    kind: LockKind,
    target: LockTarget,
}

#[derive(Debug, Clone)]
struct LockEntry {
    holder: u64,
}

/// An effect the caller must broadcast or unicast after a lock operation.
#[derive(Debug, Clone)]
pub enum LockEvent {
    Granted { kind: LockKind, target: LockTarget, holder: u64 },
    Released { kind: LockKind, target: LockTarget, holder: u64 },
    Denied { kind: LockKind, target: LockTarget, holder: u64, requester: u64 },
}

/// One held lock, as listed in a `HANDSHAKE`'s lock list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub kind: LockKind,
    pub target: LockTarget,
    pub holder: u64,
}

#[derive(Debug, Default)]
pub struct LockManager {
    locks: IndexMap<LockKey, LockEntry>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder_of(&self, kind: LockKind, target: &LockTarget) -> Option<u64> {
        self.locks
            .get(&LockKey { kind, target: target.clone() })
            .map(|e| e.holder)
    }

    /// Every lock currently held, for a `HANDSHAKE`'s lock list.
    pub fn snapshot(&self) -> Vec<LockSnapshot> {
        self.locks
            .iter()
            .map(|(key, entry)| LockSnapshot { kind: key.kind, target: key.target.clone(), holder: entry.holder })
            .collect()
    }

    /// Attempts to grant `kind` over `target` to `requester`. Returns the
    /// sequence of events the caller must broadcast, in order.
    pub fn acquire(&mut self, kind: LockKind, target: LockTarget, requester: u64) -> Vec<LockEvent> {
        let key = LockKey { kind, target: target.clone() };

        if let Some(entry) = self.locks.get(&key) {
            if entry.holder == requester {
                // Idempotent re-acquire: no state change, no event.
                return Vec::new();
            }

            if kind == LockKind::Update && self.holder_of(LockKind::Control, &target) == Some(requester) {
                // The Control holder may force-recapture a live Update lock
                // from whoever currently holds it.
                let previous_holder = entry.holder;
                self.locks.insert(key, LockEntry { holder: requester });
                return vec![
                    LockEvent::Released { kind, target: target.clone(), holder: previous_holder },
                    LockEvent::Granted { kind, target, holder: requester },
                ];
            }

            return vec![LockEvent::Denied {
                kind,
                target,
                holder: entry.holder,
                requester,
            }];
        }

        if kind == LockKind::Update {
            // A fresh Update request bumps a background UnloadedUpdate
            // holder rather than being denied.
            let unloaded_key = LockKey { kind: LockKind::UnloadedUpdate, target: target.clone() };
            if let Some(unloaded) = self.locks.get(&unloaded_key).cloned() {
                if unloaded.holder != requester {
                    self.locks.remove(&unloaded_key);
                    self.locks.insert(key, LockEntry { holder: requester });
                    return vec![
                        LockEvent::Released { kind: LockKind::UnloadedUpdate, target: target.clone(), holder: unloaded.holder },
                        LockEvent::Granted { kind, target, holder: requester },
                    ];
                }
            }
        }

        self.locks.insert(key, LockEntry { holder: requester });
        vec![LockEvent::Granted { kind, target, holder: requester }]
    }

    pub fn release(&mut self, kind: LockKind, target: LockTarget, requester: u64) -> Vec<LockEvent> {
        let key = LockKey { kind, target: target.clone() };
        match self.locks.get(&key) {
            Some(entry) if entry.holder == requester => {
                self.locks.remove(&key);
                vec![LockEvent::Released { kind, target, holder: requester }]
            }
            _ => Vec::new(),
        }
    }

    /// Releases every lock held against a vessel, used when that vessel is
    /// removed from the match.
    pub fn release_all_for_vessel(&mut self, vessel_id: uuid::Uuid) -> Vec<LockEvent> {
        let target = LockTarget::Vessel(vessel_id);
        let stale: Vec<LockKey> = self
            .locks
            .keys()
            .filter(|k| k.target == target)
            .cloned()
            .collect();

        stale
            .into_iter()
            .map(|key| {
                let entry = self.locks.remove(&key).expect("key just observed in locks");
                LockEvent::Released { kind: key.kind, target: key.target, holder: entry.holder }
            })
            .collect()
    }

    /// Releases every lock held by `session_id`, used on disconnect (spec §4.5).
    pub fn release_all_for_session(&mut self, session_id: u64) -> Vec<LockEvent> {
        let stale: Vec<LockKey> = self
            .locks
            .iter()
            .filter(|(_, e)| e.holder == session_id)
            .map(|(k, _)| k.clone())
            .collect();

        stale
            .into_iter()
            .map(|key| {
                self.locks.remove(&key);
                LockEvent::Released { kind: key.kind, target: key.target, holder: session_id }
            })
            .collect()
    }
}
