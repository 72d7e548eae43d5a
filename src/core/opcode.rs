// src/core/opcode.rs

//! The complete opcode table (spec §6) and the typed payload variants each
//! opcode decodes into. Unknown fields are ignored by `serde_json`; missing
//! required fields surface as `EngineError::Protocol`.

use crate::core::errors::EngineError;
use crate::core::match_engine::vessel::VesselType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sixteen-bit wire opcode identifying a message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

pub mod codes {
    pub const HANDSHAKE: u16 = 1;
    pub const CHAT: u16 = 2;
    pub const PLAYER_STATUS: u16 = 3;
    pub const PLAYER_COLOR: u16 = 4;
    pub const VESSEL: u16 = 10;
    pub const VESSEL_PROTO: u16 = 11;
    pub const VESSEL_UPDATE: u16 = 12;
    pub const VESSEL_REMOVE: u16 = 13;
    pub const KERBAL: u16 = 20;
    pub const ADMIN_COMMAND: u16 = 27;
    pub const SETTINGS: u16 = 30;
    pub const WARP: u16 = 40;
    pub const LOCK: u16 = 50;
    pub const SCENARIO: u16 = 60;
    pub const SHARE_PROGRESS: u16 = 70;
    pub const GROUP: u16 = 80;
    pub const CRAFT: u16 = 90;
    pub const SCREENSHOT: u16 = 100;
    pub const FLAG: u16 = 110;
}

/// A message received from a client, already authenticated with a
/// `session_id`/`user_id` by the platform layer (out of scope, spec §1).
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Chat(ChatPayload),
    PlayerStatus(PlayerStatusPayload),
    PlayerColor(PlayerColorPayload),
    VesselProto(VesselProtoPayload),
    VesselUpdate(VesselUpdatePayload),
    VesselRemove(VesselRemovePayload),
    Kerbal(KerbalPayload),
    AdminCommand(AdminCommandPayload),
    Warp(WarpPayload),
    Lock(LockPayload),
    Scenario(ScenarioPayload),
    ShareProgress(ShareProgressPayload),
    Group(GroupPayload),
    Craft(CraftPayload),
    Screenshot(ScreenshotPayload),
    Flag(FlagPayload),
}

impl ClientMessage {
    /// Parses a raw `(opcode, json payload)` pair into a typed client message.
    /// Unrecognized opcodes and malformed JSON both produce `EngineError::Protocol`;
    /// the caller (the router) logs and drops rather than disconnecting the sender.
    pub fn parse(opcode: u16, payload: &[u8]) -> Result<Self, EngineError> {
        use codes::*;
        Ok(match opcode {
            CHAT => ClientMessage::Chat(serde_json::from_slice(payload)?),
            PLAYER_STATUS => ClientMessage::PlayerStatus(serde_json::from_slice(payload)?),
            PLAYER_COLOR => ClientMessage::PlayerColor(serde_json::from_slice(payload)?),
            VESSEL_PROTO => ClientMessage::VesselProto(serde_json::from_slice(payload)?),
            VESSEL_UPDATE => ClientMessage::VesselUpdate(serde_json::from_slice(payload)?),
            VESSEL_REMOVE => ClientMessage::VesselRemove(serde_json::from_slice(payload)?),
            KERBAL => ClientMessage::Kerbal(serde_json::from_slice(payload)?),
            ADMIN_COMMAND => ClientMessage::AdminCommand(serde_json::from_slice(payload)?),
            WARP => ClientMessage::Warp(serde_json::from_slice(payload)?),
            LOCK => ClientMessage::Lock(serde_json::from_slice(payload)?),
            SCENARIO => ClientMessage::Scenario(serde_json::from_slice(payload)?),
            SHARE_PROGRESS => ClientMessage::ShareProgress(serde_json::from_slice(payload)?),
            GROUP | 81 | 82 | 83 => ClientMessage::Group(serde_json::from_slice(payload)?),
            CRAFT | 91 | 92 | 93 | 94 | 95 | 96 => {
                ClientMessage::Craft(serde_json::from_slice(payload)?)
            }
            SCREENSHOT | 101 | 102 | 103 | 104 | 105 => {
                ClientMessage::Screenshot(serde_json::from_slice(payload)?)
            }
            FLAG | 111 | 112 => ClientMessage::Flag(serde_json::from_slice(payload)?),
            other => return Err(EngineError::Protocol(format!("unknown opcode {other}"))),
        })
    }

    /// The opcode this message was decoded from, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Chat(_) => "CHAT",
            ClientMessage::PlayerStatus(_) => "PLAYER_STATUS",
            ClientMessage::PlayerColor(_) => "PLAYER_COLOR",
            ClientMessage::VesselProto(_) => "VESSEL_PROTO",
            ClientMessage::VesselUpdate(_) => "VESSEL_UPDATE",
            ClientMessage::VesselRemove(_) => "VESSEL_REMOVE",
            ClientMessage::Kerbal(_) => "KERBAL",
            ClientMessage::AdminCommand(_) => "ADMIN_COMMAND",
            ClientMessage::Warp(_) => "WARP",
            ClientMessage::Lock(_) => "LOCK",
            ClientMessage::Scenario(_) => "SCENARIO",
            ClientMessage::ShareProgress(_) => "SHARE_PROGRESS",
            ClientMessage::Group(_) => "GROUP",
            ClientMessage::Craft(_) => "CRAFT",
            ClientMessage::Screenshot(_) => "SCREENSHOT",
            ClientMessage::Flag(_) => "FLAG",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatusPayload {
    pub status: String,
    #[serde(default)]
    pub vessel_id: Option<Uuid>,
    #[serde(default)]
    pub body: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerColorPayload {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitRecord {
    pub inclination: f64,
    pub eccentricity: f64,
    pub semi_major_axis: f64,
    pub lan: f64,
    pub arg_of_periapsis: f64,
    pub mean_anomaly_at_epoch: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselProtoPayload {
    pub vessel_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub vessel_type: VesselType,
    pub body: u32,
    pub position: Vector3,
    pub rotation: Vector3,
    /// Base64-encoded opaque part tree.
    pub parts: String,
    /// Base64-encoded opaque vessel-reconstruction blob.
    #[serde(default)]
    pub proto_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselUpdatePayload {
    pub vessel_id: Uuid,
    pub position: Vector3,
    pub rotation: Vector3,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub orbit: OrbitRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselRemovePayload {
    pub vessel_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KerbalPayload {
    pub kerbal_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kerbal_type: String,
    pub status: String,
    #[serde(default)]
    pub vessel_id: Option<Uuid>,
    pub experience: f64,
    pub courage: f64,
    pub stupidity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminCommandKind {
    Dekessler,
    Nuke,
    Kick,
    Ban,
    GrantAdmin,
    RevokeAdmin,
    SetWarpMode,
    Announce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCommandPayload {
    pub command: AdminCommandKind,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpPayload {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub subspace_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LockAction {
    Acquire,
    Release,
    Denied,
    Released,
    Granted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum LockKind {
    Control,
    Update,
    UnloadedUpdate,
    Spectator,
    Asteroid,
    Kerbal,
    Contract,
    Misc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPayload {
    pub action: LockAction,
    pub lock_type: LockKind,
    #[serde(default)]
    pub vessel_id: Option<Uuid>,
    #[serde(default)]
    pub kerbal_name: Option<String>,
    #[serde(default)]
    pub owner: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPayload {
    pub module: String,
    /// Base64-encoded opaque module blob; the server never interprets this.
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareProgressPayload {
    #[serde(default)]
    pub science_delta: Option<f64>,
    #[serde(default)]
    pub funds_delta: Option<f64>,
    #[serde(default)]
    pub reputation_delta: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupAction {
    Create,
    Remove,
    Update,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPayload {
    pub action: GroupAction,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetAction {
    Upload,
    DownloadRequest,
    ListFolders,
    ListItems,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftPayload {
    pub action: AssetAction,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub craft_type: String,
    #[serde(default)]
    pub name: String,
    /// Base64-encoded craft file contents, present on `upload`.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    pub action: AssetAction,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub date_taken: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagPayload {
    pub action: AssetAction,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Option<String>,
}
