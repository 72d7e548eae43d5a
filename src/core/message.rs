// src/core/message.rs

//! Outbound message construction: every server-to-client message the
//! Dispatcher (§4.2) can enqueue, paired with the opcode it is framed under.

use crate::core::codec::Frame;
use crate::core::opcode::{codes, LockAction, LockKind};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// A message ready to be framed and sent to one or more sessions.
#[derive(Debug, Clone)]
pub struct ServerMessage {
    pub opcode: u16,
    pub json: serde_json::Value,
}

impl ServerMessage {
    fn new(opcode: u16, json: serde_json::Value) -> Self {
        Self { opcode, json }
    }

    pub fn into_frame(self) -> Frame {
        let bytes = serde_json::to_vec(&self.json).unwrap_or_default();
        Frame::new(self.opcode, bytes)
    }

    pub fn handshake(snapshot: serde_json::Value) -> Self {
        Self::new(codes::HANDSHAKE, snapshot)
    }

    pub fn chat(sender: u64, message: &str, channel: Option<&str>) -> Self {
        Self::new(codes::CHAT, json!({ "sender": sender, "message": message, "channel": channel }))
    }

    pub fn player_status(session_id: u64, status: &str) -> Self {
        Self::new(codes::PLAYER_STATUS, json!({ "session_id": session_id, "status": status }))
    }

    pub fn player_color(session_id: u64, r: f32, g: f32, b: f32) -> Self {
        Self::new(codes::PLAYER_COLOR, json!({ "session_id": session_id, "r": r, "g": g, "b": b }))
    }

    pub fn vessel_proto(payload: &impl Serialize) -> Self {
        Self::new(codes::VESSEL_PROTO, serde_json::to_value(payload).unwrap())
    }

    pub fn vessel_update(payload: &impl Serialize) -> Self {
        Self::new(codes::VESSEL_UPDATE, serde_json::to_value(payload).unwrap())
    }

    pub fn vessel_remove(vessel_id: Uuid) -> Self {
        Self::new(codes::VESSEL_REMOVE, json!({ "vessel_id": vessel_id }))
    }

    pub fn kerbal(payload: &impl Serialize) -> Self {
        Self::new(codes::KERBAL, serde_json::to_value(payload).unwrap())
    }

    pub fn settings(json: serde_json::Value) -> Self {
        Self::new(codes::SETTINGS, json)
    }

    pub fn time_sync(universe_time: f64, tick_count: u64) -> Self {
        Self::new(
            codes::SETTINGS,
            json!({ "kind": "time_sync", "universe_time": universe_time, "tick_count": tick_count }),
        )
    }

    pub fn warp(mode: &str, rate: Option<f64>, universe_time: f64) -> Self {
        Self::new(codes::WARP, json!({ "mode": mode, "rate": rate, "universe_time": universe_time }))
    }

    pub fn lock(
        action: LockAction,
        lock_type: LockKind,
        vessel_id: Option<Uuid>,
        kerbal_name: Option<&str>,
        owner: Option<u64>,
        reason: Option<&str>,
    ) -> Self {
        Self::new(
            codes::LOCK,
            json!({
                "action": action,
                "lock_type": lock_type,
                "vessel_id": vessel_id,
                "kerbal_name": kerbal_name,
                "owner": owner,
                "reason": reason,
            }),
        )
    }

    pub fn scenario(module: &str, data_b64: &str) -> Self {
        Self::new(codes::SCENARIO, json!({ "module": module, "data": data_b64 }))
    }

    pub fn share_progress(science: f64, funds: f64, reputation: f64) -> Self {
        Self::new(
            codes::SHARE_PROGRESS,
            json!({ "science": science, "funds": funds, "reputation": reputation }),
        )
    }

    pub fn asset_notification(opcode: u16, folder: &str, key: &str, deleted: bool) -> Self {
        Self::new(opcode, json!({ "folder": folder, "key": key, "deleted": deleted }))
    }

    /// The reply to a `DownloadRequest`: the decoded asset re-encoded as
    /// base64 for the wire, alongside its stored checksum.
    pub fn asset_download(opcode: u16, folder: &str, name: &str, data_b64: &str, crc32: u32) -> Self {
        Self::new(
            opcode,
            json!({ "action": "download", "folder": folder, "name": name, "data": data_b64, "crc32": crc32 }),
        )
    }

    /// The reply to a `ListFolders`/`ListItems` request.
    pub fn asset_list(opcode: u16, folder: &str, items: &[String]) -> Self {
        Self::new(opcode, json!({ "action": "list", "folder": folder, "items": items }))
    }

    pub fn advisory(text: &str) -> Self {
        Self::new(codes::SETTINGS, json!({ "kind": "advisory", "message": text }))
    }

    pub fn denied(lock_type: LockKind, vessel_id: Option<Uuid>, current_holder: u64) -> Self {
        Self::lock(
            LockAction::Denied,
            lock_type,
            vessel_id,
            None,
            Some(current_holder),
            None,
        )
    }
}
