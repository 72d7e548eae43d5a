// src/core/match_engine/vessel.rs

//! The `Vessel` entity (spec §3) and its type taxonomy.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::opcode::{OrbitRecord, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::EnumIter)]
#[serde(rename_all = "PascalCase")]
pub enum VesselType {
    Ship,
    Debris,
    Probe,
    Plane,
    Rover,
    Base,
    Station,
    EVA,
    SpaceObject,
    Unknown,
}

impl Default for VesselType {
    fn default() -> Self {
        VesselType::Unknown
    }
}

/// An object tracked in the shared universe, identified by a stable `Uuid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    pub id: Uuid,
    pub name: String,
    pub vessel_type: VesselType,
    pub owner: Option<u64>,
    pub body: u32,
    pub position: Vector3,
    pub rotation: Vector3,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub orbit: Option<OrbitRecord>,
    /// Opaque, base64-decoded part tree; the server never interprets this.
    pub parts: Bytes,
    pub proto_data: Option<Bytes>,
    /// Wall-clock timestamp of the last accepted `VESSEL_UPDATE`, used by the
    /// anti-cheat interval and teleport checks.
    pub last_update_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Free-text landed-site label, as reported by the client. Used verbatim
    /// (case-insensitively) by the admin `Nuke` command's site match.
    pub landed_at: Option<String>,
}

impl Vessel {
    pub fn new(
        id: Uuid,
        name: String,
        vessel_type: VesselType,
        owner: Option<u64>,
        body: u32,
        position: Vector3,
        rotation: Vector3,
        parts: Bytes,
        proto_data: Option<Bytes>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            vessel_type,
            owner,
            body,
            position,
            rotation,
            velocity: Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            angular_velocity: Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            orbit: None,
            parts,
            proto_data,
            last_update_at: now,
            created_at: now,
            landed_at: None,
        }
    }

    pub fn is_at_site(&self, needle: &str) -> bool {
        self.landed_at
            .as_deref()
            .is_some_and(|site| site.to_lowercase().contains(&needle.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_match_is_case_insensitive() {
        let mut v = Vessel::new(
            Uuid::new_v4(),
            "Debris".into(),
            VesselType::Debris,
            None,
            1,
            Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            Bytes::new(),
            None,
        );
        v.landed_at = Some("KSC Launchpad 01".to_string());
        assert!(v.is_at_site("launchpad"));
        assert!(v.is_at_site("KSC"));
        assert!(!v.is_at_site("mun"));
    }
}
