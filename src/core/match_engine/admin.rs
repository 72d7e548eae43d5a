// src/core/match_engine/admin.rs

//! Admin plane (spec §4.9): who may issue privileged commands, and the two
//! bulk vessel operations (`Dekessler`, `Nuke`) those commands unlock.

use indexmap::{IndexMap, IndexSet};
use uuid::Uuid;

use super::vessel::{Vessel, VesselType};

/// The set of admin `user_id`s for a match, persisted across restarts via the
/// storage adapter's `admins` collection.
#[derive(Debug, Default, Clone)]
pub struct AdminState {
    admins: IndexSet<String>,
}

impl AdminState {
    pub fn from_persisted(user_ids: impl IntoIterator<Item = String>) -> Self {
        Self { admins: user_ids.into_iter().collect() }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    pub fn promote(&mut self, user_id: &str) {
        self.admins.insert(user_id.to_string());
    }

    pub fn revoke(&mut self, user_id: &str) {
        self.admins.shift_remove(user_id);
    }

    pub fn persisted(&self) -> Vec<String> {
        self.admins.iter().cloned().collect()
    }

    /// A match with no admins promotes its first joiner, so a fresh server is
    /// never locked out of its own admin plane. Returns `true` if promoted.
    pub fn auto_promote_first_joiner(&mut self, user_id: &str) -> bool {
        if self.admins.is_empty() {
            self.promote(user_id);
            true
        } else {
            false
        }
    }
}

/// Removes every `Debris`-typed vessel, returning the ids removed for
/// tombstoning and broadcast.
pub fn dekessler(vessels: &mut IndexMap<Uuid, Vessel>) -> Vec<Uuid> {
    let doomed: Vec<Uuid> = vessels
        .iter()
        .filter(|(_, v)| v.vessel_type == VesselType::Debris)
        .map(|(id, _)| *id)
        .collect();
    for id in &doomed {
        vessels.shift_remove(id);
    }
    doomed
}

/// The fixed set of home-world landing sites Nuke clears (spec §4.9): unlike
/// `Dekessler`, the client never supplies a site — every vessel parked at any
/// of these three is doomed.
const NUKE_SITES: [&str; 3] = ["KSC", "Runway", "Launchpad"];

/// Removes every vessel whose reported landing site case-insensitively
/// contains one of `NUKE_SITES`. Vessels in flight (no landing site) are
/// never matched.
pub fn nuke(vessels: &mut IndexMap<Uuid, Vessel>) -> Vec<Uuid> {
    let doomed: Vec<Uuid> = vessels
        .iter()
        .filter(|(_, v)| NUKE_SITES.iter().any(|site| v.is_at_site(site)))
        .map(|(id, _)| *id)
        .collect();
    for id in &doomed {
        vessels.shift_remove(id);
    }
    doomed
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::core::opcode::Vector3;

    fn zero() -> Vector3 {
        Vector3 { x: 0.0, y: 0.0, z: 0.0 }
    }

    fn make_vessel(vessel_type: VesselType, landed_at: Option<&str>) -> (Uuid, Vessel) {
        let id = Uuid::new_v4();
        let mut v = Vessel::new(id, "v".into(), vessel_type, None, 1, zero(), zero(), Bytes::new(), None);
        v.landed_at = landed_at.map(|s| s.to_string());
        (id, v)
    }

    #[test]
    fn first_joiner_is_auto_promoted() {
        let mut admins = AdminState::default();
        assert!(admins.auto_promote_first_joiner("alice"));
        assert!(admins.is_admin("alice"));
        assert!(!admins.auto_promote_first_joiner("bob"));
        assert!(!admins.is_admin("bob"));
    }

    #[test]
    fn dekessler_removes_only_debris() {
        let mut vessels = IndexMap::new();
        let (ship_id, ship) = make_vessel(VesselType::Ship, None);
        let (debris_id, debris) = make_vessel(VesselType::Debris, None);
        vessels.insert(ship_id, ship);
        vessels.insert(debris_id, debris);

        let removed = dekessler(&mut vessels);
        assert_eq!(removed, vec![debris_id]);
        assert!(vessels.contains_key(&ship_id));
    }

    #[test]
    fn nuke_matches_any_fixed_site_case_insensitively() {
        let mut vessels = IndexMap::new();
        let (pad_id, pad) = make_vessel(VesselType::Ship, Some("ksc launchpad"));
        let (runway_id, runway) = make_vessel(VesselType::Ship, Some("Runway 09"));
        let (orbit_id, orbit) = make_vessel(VesselType::Ship, None);
        vessels.insert(pad_id, pad);
        vessels.insert(runway_id, runway);
        vessels.insert(orbit_id, orbit);

        let mut removed = nuke(&mut vessels);
        removed.sort();
        let mut expected = vec![pad_id, runway_id];
        expected.sort();
        assert_eq!(removed, expected);
        assert!(vessels.contains_key(&orbit_id));
    }
}
