// src/core/match_engine/router.rs

//! Routes an authenticated, decoded `ClientMessage` to the state mutation and
//! broadcasts it implies (spec §4.2, §4.4–§4.9). Asset-kind messages
//! (`Craft`/`Screenshot`/`Flag`) need async storage access and are instead
//! handed back to the caller as an `AssetIntent` for the match actor to run
//! against the broker.

use base64::Engine as _;
use bytes::Bytes;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::core::assets::kind::AssetKind;
use crate::core::errors::EngineError;
use crate::core::message::ServerMessage;
use crate::core::opcode::{
    AdminCommandKind, AssetAction, ClientMessage, LockAction, LockKind, VesselProtoPayload, VesselUpdatePayload,
};

use super::admin::{dekessler, nuke};
use super::dispatcher::Dispatcher;
use super::kerbal::Kerbal;
use super::lock_manager::{LockEvent, LockTarget};
use super::player::PlayerStatus;
use super::state::MatchState;
use super::vessel::Vessel;
use super::vessel_sync::AntiCheatRejection;
use super::warp::WarpMode;

/// A request the router could not finish itself because it needs the asset
/// broker's async storage access.
#[derive(Debug, Clone)]
pub enum AssetIntent {
    Craft(crate::core::opcode::CraftPayload),
    Screenshot(crate::core::opcode::ScreenshotPayload),
    Flag(crate::core::opcode::FlagPayload),
    Group(crate::core::opcode::GroupPayload),
}

fn decode_b64(data: &str) -> Result<Bytes, EngineError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map(Bytes::from)
        .map_err(|e| EngineError::Protocol(format!("invalid base64: {e}")))
}

pub(crate) fn broadcast_lock_events(dispatcher: &Dispatcher, events: Vec<LockEvent>) {
    for event in events {
        let msg = match event {
            LockEvent::Granted { kind, target, holder } => ServerMessage::lock(
                LockAction::Granted,
                kind,
                target_vessel(&target),
                target_kerbal(&target),
                Some(holder),
                None,
            ),
            LockEvent::Released { kind, target, holder } => ServerMessage::lock(
                LockAction::Released,
                kind,
                target_vessel(&target),
                target_kerbal(&target),
                Some(holder),
                None,
            ),
            LockEvent::Denied { kind, target, holder, requester } => {
                dispatcher.unicast(
                    requester,
                    ServerMessage::denied(kind, target_vessel(&target), holder),
                );
                continue;
            }
        };
        dispatcher.broadcast(msg);
    }
}

fn target_vessel(target: &LockTarget) -> Option<Uuid> {
    match target {
        LockTarget::Vessel(id) => Some(*id),
        _ => None,
    }
}

fn target_kerbal(target: &LockTarget) -> Option<&str> {
    match target {
        LockTarget::Kerbal(name) => Some(name),
        _ => None,
    }
}

/// Routes one client message, mutating `state` and emitting broadcasts via
/// `dispatcher`. Returns an `AssetIntent` when the caller must forward the
/// request to the asset broker.
pub fn route(
    state: &mut MatchState,
    dispatcher: &mut Dispatcher,
    session_id: u64,
    msg: ClientMessage,
) -> Option<AssetIntent> {
    match msg {
        ClientMessage::Chat(payload) => {
            if !state.chat_limiter.allow(session_id, Instant::now()) {
                return None;
            }
            dispatcher.broadcast(ServerMessage::chat(session_id, &payload.message, payload.channel.as_deref()));
        }

        ClientMessage::PlayerStatus(payload) => {
            if let Some(player) = state.players.get_mut(&session_id) {
                player.touch();
                player.status = match payload.status.as_str() {
                    "loading" => PlayerStatus::Loading,
                    "connected" => PlayerStatus::Connected,
                    "in_flight" => PlayerStatus::InFlight,
                    "idle" => PlayerStatus::Idle,
                    _ => player.status,
                };
                player.controlled_vessel = payload.vessel_id;
            }
            dispatcher.broadcast(ServerMessage::player_status(session_id, &payload.status));
        }

        ClientMessage::PlayerColor(payload) => {
            if let Some(player) = state.players.get_mut(&session_id) {
                player.color = super::player::PlayerColor { r: payload.r, g: payload.g, b: payload.b };
            }
            dispatcher.broadcast(ServerMessage::player_color(session_id, payload.r, payload.g, payload.b));
        }

        ClientMessage::VesselProto(payload) => handle_vessel_proto(state, dispatcher, session_id, payload),

        ClientMessage::VesselUpdate(payload) => handle_vessel_update(state, dispatcher, session_id, payload),

        ClientMessage::VesselRemove(payload) => {
            let is_admin = state
                .players
                .get(&session_id)
                .is_some_and(|p| state.admin.is_admin(&p.user_id));
            let is_owner = state.vessels.get(&payload.vessel_id).and_then(|v| v.owner) == Some(session_id);
            if !is_admin && !is_owner {
                warn!(session_id, vessel_id = %payload.vessel_id, "rejected vessel removal by non-owner");
                return None;
            }
            state.vessels.shift_remove(&payload.vessel_id);
            state.update_guard.forget(&payload.vessel_id);
            state.tombstones.mark_removed(payload.vessel_id, Instant::now());
            let events = state.locks.release_all_for_vessel(payload.vessel_id);
            broadcast_lock_events(dispatcher, events);
            dispatcher.broadcast(ServerMessage::vessel_remove(payload.vessel_id));
        }

        ClientMessage::Kerbal(payload) => {
            let kerbal = state
                .kerbals
                .entry(payload.kerbal_id.clone())
                .or_insert_with(|| Kerbal::new(payload.kerbal_id.clone(), payload.kerbal_type.clone()));
            kerbal.vessel_id = payload.vessel_id;
            kerbal.experience = payload.experience;
            kerbal.courage = payload.courage;
            kerbal.stupidity = payload.stupidity;
            dispatcher.broadcast(ServerMessage::kerbal(&payload));
        }

        ClientMessage::AdminCommand(payload) => handle_admin_command(state, dispatcher, session_id, payload),

        ClientMessage::Warp(payload) => {
            if let Some(rate) = payload.rate {
                state.warp.set_rate(session_id, rate);
            }
            if matches!(state.warp.mode, WarpMode::Subspace) {
                if let Some(subspace_id) = payload.subspace_id {
                    state.warp.rejoin_subspace(session_id, subspace_id);
                } else if payload.rate.map(|r| r > 1.0).unwrap_or(false) {
                    state.warp.enter_new_subspace(session_id, state.warp.universe_time());
                }
            }
            dispatcher.unicast(
                session_id,
                ServerMessage::warp(warp_mode_name(state.warp.mode), payload.rate, state.warp.universe_time()),
            );
        }

        ClientMessage::Lock(payload) => match payload.action {
            LockAction::Acquire => {
                let target = lock_target(&payload.lock_type, payload.vessel_id, payload.kerbal_name.as_deref());
                if let Some(target) = target {
                    let events = state.locks.acquire(payload.lock_type, target, session_id);
                    broadcast_lock_events(dispatcher, events);
                }
            }
            LockAction::Release => {
                let target = lock_target(&payload.lock_type, payload.vessel_id, payload.kerbal_name.as_deref());
                if let Some(target) = target {
                    let events = state.locks.release(payload.lock_type, target, session_id);
                    broadcast_lock_events(dispatcher, events);
                }
            }
            _ => {}
        },

        ClientMessage::Scenario(payload) => {
            if let Ok(data) = decode_b64(&payload.data) {
                state.scenario.set_module(payload.module.clone(), data);
                dispatcher.broadcast_except(session_id, ServerMessage::scenario(&payload.module, &payload.data));
            }
        }

        ClientMessage::ShareProgress(payload) => {
            state
                .scenario
                .apply_delta(payload.science_delta, payload.funds_delta, payload.reputation_delta);
            dispatcher.broadcast(ServerMessage::share_progress(
                state.scenario.science,
                state.scenario.funds,
                state.scenario.reputation,
            ));
        }

        ClientMessage::Group(payload) => return Some(AssetIntent::Group(payload)),
        ClientMessage::Craft(payload) => {
            if !check_asset_upload_rate(state, dispatcher, session_id, AssetKind::Craft, payload.action) {
                return None;
            }
            return Some(AssetIntent::Craft(payload));
        }
        ClientMessage::Screenshot(payload) => {
            if !check_asset_upload_rate(state, dispatcher, session_id, AssetKind::Screenshot, payload.action) {
                return None;
            }
            return Some(AssetIntent::Screenshot(payload));
        }
        ClientMessage::Flag(payload) => {
            if !check_asset_upload_rate(state, dispatcher, session_id, AssetKind::Flag, payload.action) {
                return None;
            }
            return Some(AssetIntent::Flag(payload));
        }
    }
    None
}

/// Enforces the per-kind upload cooldown (spec §4.9) before the asset intent
/// is even handed back to the match actor. Only `Upload` is rate-limited;
/// reads and deletes pass straight through.
fn check_asset_upload_rate(
    state: &mut MatchState,
    dispatcher: &Dispatcher,
    session_id: u64,
    kind: AssetKind,
    action: AssetAction,
) -> bool {
    if action != AssetAction::Upload {
        return true;
    }
    let Some(user_id) = state.players.get(&session_id).map(|p| p.user_id.clone()) else {
        return false;
    };
    if !state.asset_upload_limiter.check_and_record(kind, &user_id, Instant::now()) {
        dispatcher.unicast(session_id, ServerMessage::advisory("asset upload rate limit exceeded"));
        return false;
    }
    true
}

fn lock_target(kind: &LockKind, vessel_id: Option<Uuid>, kerbal_name: Option<&str>) -> Option<LockTarget> {
    match kind {
        LockKind::Kerbal => kerbal_name.map(|n| LockTarget::Kerbal(n.to_string())),
        LockKind::Contract | LockKind::Misc => vessel_id.map(|id| LockTarget::Named(id.to_string())),
        _ => vessel_id.map(LockTarget::Vessel),
    }
}

fn warp_mode_name(mode: WarpMode) -> &'static str {
    match mode {
        WarpMode::Subspace => "subspace",
        WarpMode::Mcu => "mcu",
        WarpMode::Admin => "admin",
    }
}

fn handle_vessel_proto(state: &mut MatchState, dispatcher: &Dispatcher, session_id: u64, payload: VesselProtoPayload) {
    let Some(user_id) = state.players.get(&session_id).map(|p| p.user_id.clone()) else {
        return;
    };
    if !state.proto_limiter.check_and_record(&user_id, Instant::now()) {
        dispatcher.unicast(session_id, ServerMessage::advisory("vessel spawn rate limit exceeded"));
        return;
    }
    let Ok(parts) = decode_b64(&payload.parts) else { return };
    let proto_data = payload.proto_data.as_deref().and_then(|d| decode_b64(d).ok());

    let vessel = Vessel::new(
        payload.vessel_id,
        payload.name.clone(),
        payload.vessel_type,
        Some(session_id),
        payload.body,
        payload.position.clone(),
        payload.rotation.clone(),
        parts,
        proto_data,
    );
    state.vessels.insert(payload.vessel_id, vessel);

    let events = state
        .locks
        .acquire(LockKind::Control, LockTarget::Vessel(payload.vessel_id), session_id);
    broadcast_lock_events(dispatcher, events);
    dispatcher.broadcast(ServerMessage::vessel_proto(&payload));
}

fn handle_vessel_update(state: &mut MatchState, dispatcher: &Dispatcher, session_id: u64, payload: VesselUpdatePayload) {
    let has_update_lock = state.locks.holder_of(LockKind::Update, &LockTarget::Vessel(payload.vessel_id)) == Some(session_id);
    if !has_update_lock {
        dispatcher.unicast(
            session_id,
            ServerMessage::denied(
                LockKind::Update,
                Some(payload.vessel_id),
                state.locks.holder_of(LockKind::Update, &LockTarget::Vessel(payload.vessel_id)).unwrap_or(0),
            ),
        );
        return;
    }

    let now = Instant::now();
    if state.tombstones.is_tombstoned(&payload.vessel_id, now) {
        return;
    }

    match state.update_guard.validate(payload.vessel_id, &payload.position, &payload.velocity, now) {
        Ok(()) => {}
        Err(rejection) => {
            crate::core::metrics::ANTICHEAT_REJECTIONS_TOTAL.inc();
            warn!(session_id, vessel_id = %payload.vessel_id, ?rejection, "vessel update rejected");
            return;
        }
    }

    if let Some(vessel) = state.vessels.get_mut(&payload.vessel_id) {
        vessel.position = payload.position.clone();
        vessel.rotation = payload.rotation.clone();
        vessel.velocity = payload.velocity.clone();
        vessel.angular_velocity = payload.angular_velocity.clone();
        vessel.orbit = Some(payload.orbit.clone());
        vessel.last_update_at = chrono::Utc::now();
    }
    dispatcher.broadcast_except(session_id, ServerMessage::vessel_update(&payload));
}

fn handle_admin_command(
    state: &mut MatchState,
    dispatcher: &mut Dispatcher,
    session_id: u64,
    payload: crate::core::opcode::AdminCommandPayload,
) {
    let Some(user_id) = state.players.get(&session_id).map(|p| p.user_id.clone()) else {
        return;
    };
    if !state.admin.is_admin(&user_id) {
        dispatcher.unicast(session_id, ServerMessage::advisory("admin privileges required"));
        return;
    }

    match payload.command {
        AdminCommandKind::Dekessler => {
            let removed = dekessler(&mut state.vessels);
            for id in removed {
                state.tombstones.mark_removed(id, Instant::now());
                broadcast_lock_events(dispatcher, state.locks.release_all_for_vessel(id));
                dispatcher.broadcast(ServerMessage::vessel_remove(id));
            }
        }
        AdminCommandKind::Nuke => {
            let removed = nuke(&mut state.vessels);
            for id in removed {
                state.tombstones.mark_removed(id, Instant::now());
                broadcast_lock_events(dispatcher, state.locks.release_all_for_vessel(id));
                dispatcher.broadcast(ServerMessage::vessel_remove(id));
            }
        }
        AdminCommandKind::Kick => {
            if let Some(target) = payload.args.get("session_id").and_then(|v| v.as_u64()) {
                dispatcher.kick(target, "kicked by admin");
            }
        }
        AdminCommandKind::Ban => {}
        AdminCommandKind::GrantAdmin => {
            if let Some(target) = payload.args.get("user_id").and_then(|v| v.as_str()) {
                state.admin.promote(target);
            }
        }
        AdminCommandKind::RevokeAdmin => {
            if let Some(target) = payload.args.get("user_id").and_then(|v| v.as_str()) {
                state.admin.revoke(target);
            }
        }
        AdminCommandKind::SetWarpMode => {}
        AdminCommandKind::Announce => {
            if let Some(text) = payload.args.get("message").and_then(|v| v.as_str()) {
                dispatcher.broadcast(ServerMessage::advisory(text));
            }
        }
    }
}
