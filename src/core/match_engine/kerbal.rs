// src/core/match_engine/kerbal.rs

//! The `Kerbal` entity (spec §3): crew members, keyed by name (unique per
//! match, assigned by the client at creation).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KerbalStatus {
    Available,
    Assigned,
    Dead,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kerbal {
    pub name: String,
    pub kerbal_type: String,
    pub status: KerbalStatus,
    pub vessel_id: Option<Uuid>,
    pub experience: f64,
    pub courage: f64,
    pub stupidity: f64,
}

impl Kerbal {
    pub fn new(name: String, kerbal_type: String) -> Self {
        Self {
            name,
            kerbal_type,
            status: KerbalStatus::Available,
            vessel_id: None,
            experience: 0.0,
            courage: 0.5,
            stupidity: 0.5,
        }
    }
}
