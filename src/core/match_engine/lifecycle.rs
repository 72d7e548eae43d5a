// src/core/match_engine/lifecycle.rs

//! `MatchActor`: the single task that owns one match's state for its entire
//! lifetime (spec §5). Everything else — connection handlers, the registry,
//! the admin plane — talks to a running match only through its `Envelope`
//! inbox and its label `watch` channel; no lock ever crosses a match
//! boundary.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ModControl, ModControlPolicy};
use crate::core::assets::broker::AssetBroker;
use crate::core::codec::Frame;
use crate::core::errors::EngineError;
use crate::core::message::ServerMessage;
use crate::core::metrics;
use crate::core::opcode::ClientMessage;
use crate::core::registry::bans::BanList;
use crate::core::storage::adapter::{StorageAdapter, collections};

use super::admin::AdminState;
use super::dispatcher::Dispatcher;
use super::router::{self, AssetIntent};
use super::state::{GameMode, MatchState};
use super::warp::WarpMode;

/// A ratio of the tick budget beyond which three consecutive overruns flip
/// the match into a degraded, catch-up mode (spec §5).
const SLOW_TICK_BUDGET_MULTIPLIER: u32 = 2;
const SLOW_TICK_DEGRADE_THRESHOLD: u32 = 3;
const SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Time-sync is broadcast once every this many ticks (1 Hz at the reference
/// 20 Hz tick rate), not every tick (spec §4.3).
const TIME_SYNC_TICK_INTERVAL: u64 = 20;
/// A player who sends nothing for this long is kicked as idle (spec §4.3's
/// periodic work).
const IDLE_KICK_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// A decoded inbound message, tagged with the session and user it came from.
/// The connection layer authenticates and assigns `user_id` before this is
/// ever constructed; the match actor trusts it.
#[derive(Debug)]
pub struct Envelope {
    pub session_id: u64,
    pub user_id: String,
    pub frame: Frame,
}

pub struct JoinRequest {
    pub session_id: u64,
    pub user_id: String,
    pub username: String,
    pub password: Option<String>,
    /// The client's installed mod list, checked against the match's
    /// `ModControl` manifest per `mod_control_policy` (spec §4's open
    /// question, resolved in `DESIGN.md`).
    pub mods: Vec<String>,
    pub outbox: mpsc::UnboundedSender<ServerMessage>,
    pub reply: tokio::sync::oneshot::Sender<Result<(), EngineError>>,
}

pub enum ControlMessage {
    Join(JoinRequest),
    Leave(u64),
    Shutdown,
}

pub struct MatchConfig {
    pub server_name: String,
    pub password: Option<String>,
    pub max_players: usize,
    pub tick_hz: u32,
    pub warp_mode: WarpMode,
    pub auto_promote_first_joiner: bool,
    pub mod_control: ModControlPolicy,
    pub mod_manifest: Arc<ModControl>,
}

pub struct MatchHandle {
    pub match_id: Uuid,
    pub inbox: mpsc::Sender<Envelope>,
    pub control: mpsc::Sender<ControlMessage>,
    pub label: watch::Receiver<serde_json::Value>,
}

pub struct MatchActor {
    match_id: Uuid,
    state: MatchState,
    dispatcher: Dispatcher,
    inbox: mpsc::Receiver<Envelope>,
    control: mpsc::Receiver<ControlMessage>,
    storage: Arc<dyn StorageAdapter>,
    asset_broker: Arc<AssetBroker>,
    bans: Arc<BanList>,
    label_tx: watch::Sender<serde_json::Value>,
    auto_promote_first_joiner: bool,
    mod_control: ModControlPolicy,
    mod_manifest: Arc<ModControl>,
}

impl MatchActor {
    /// Spawns a match actor task and returns the handle external callers use
    /// to reach it (spec §6's `create_match`).
    pub fn spawn(
        config: MatchConfig,
        storage: Arc<dyn StorageAdapter>,
        asset_broker: Arc<AssetBroker>,
        bans: Arc<BanList>,
    ) -> MatchHandle {
        let match_id = Uuid::new_v4();
        let admin = AdminState::default();
        let state = MatchState::new(
            match_id,
            config.server_name.clone(),
            config.password.clone(),
            GameMode::Sandbox,
            config.max_players,
            config.tick_hz,
            config.warp_mode,
            admin,
        );

        let (inbox_tx, inbox_rx) = mpsc::channel(1024);
        let (control_tx, control_rx) = mpsc::channel(64);
        let (label_tx, label_rx) = watch::channel(state.label());

        let actor = MatchActor {
            match_id,
            state,
            dispatcher: Dispatcher::new(),
            inbox: inbox_rx,
            control: control_rx,
            storage,
            asset_broker,
            bans,
            label_tx,
            auto_promote_first_joiner: config.auto_promote_first_joiner,
            mod_control: config.mod_control,
            mod_manifest: config.mod_manifest,
        };

        let span = info_span!("match", match_id = %match_id);
        tokio::spawn(actor.run().instrument(span));

        MatchHandle { match_id, inbox: inbox_tx, control: control_tx, label: label_rx }
    }

    async fn run(mut self) {
        metrics::ACTIVE_MATCHES.inc();
        let tick_period = Duration::from_secs_f64(1.0 / self.state.tick_hz as f64);
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_save = Instant::now();

        loop {
            tokio::select! {
                biased;

                control = self.control.recv() => {
                    match control {
                        Some(ControlMessage::Join(req)) => self.handle_join(req).await,
                        Some(ControlMessage::Leave(session_id)) => self.handle_leave(session_id),
                        Some(ControlMessage::Shutdown) | None => break,
                    }
                }

                _ = ticker.tick() => {
                    self.tick().await;
                    if last_save.elapsed() >= SAVE_INTERVAL {
                        self.persist().await;
                        last_save = Instant::now();
                    }
                }
            }
        }

        self.persist().await;
        metrics::ACTIVE_MATCHES.dec();
        info!(match_id = %self.match_id, "match shut down");
    }

    async fn handle_join(&mut self, req: JoinRequest) {
        let result = self.try_join(&req).await;
        let _ = req.reply.send(result);
    }

    async fn try_join(&mut self, req: &JoinRequest) -> Result<(), EngineError> {
        if self.state.is_full() {
            return Err(EngineError::ServerFull);
        }
        if !self.state.check_password(req.password.as_deref()) {
            return Err(EngineError::InvalidPassword);
        }
        if self.bans.is_banned(&req.user_id).await? {
            return Err(EngineError::Banned(req.user_id.clone()));
        }
        self.check_mod_compatibility(req)?;

        self.dispatcher.register(req.session_id, req.outbox.clone());
        let player = super::player::Player::new(req.session_id, req.user_id.clone(), req.username.clone(), 0);
        let promoted = self.auto_promote_first_joiner && self.state.admin.auto_promote_first_joiner(&req.user_id);
        self.state.join(player);
        if promoted {
            info!(user_id = %req.user_id, "auto-promoted first joiner to admin");
        }

        self.dispatcher.unicast(req.session_id, ServerMessage::handshake(self.state.handshake_snapshot()));
        self.broadcast_label();
        metrics::CONNECTED_PLAYERS.inc();
        Ok(())
    }

    /// Compares a joining client's mod list against the published manifest
    /// (spec §9's open question: resolved as a configured policy rather than
    /// a single hardcoded behavior). `Off` never looks; `Warn` logs a
    /// mismatch but still admits the player; only `Enforce` rejects.
    fn check_mod_compatibility(&self, req: &JoinRequest) -> Result<(), EngineError> {
        if self.mod_control == ModControlPolicy::Off {
            return Ok(());
        }

        let missing_required: Vec<String> = self
            .mod_manifest
            .required_mods
            .iter()
            .filter(|m| !req.mods.contains(m))
            .cloned()
            .collect();
        let forbidden_present: Vec<String> = self
            .mod_manifest
            .forbidden_mods
            .iter()
            .filter(|m| req.mods.contains(m))
            .cloned()
            .collect();

        if missing_required.is_empty() && forbidden_present.is_empty() {
            return Ok(());
        }

        match self.mod_control {
            ModControlPolicy::Off => unreachable!(),
            ModControlPolicy::Warn => {
                warn!(
                    user_id = %req.user_id,
                    ?missing_required,
                    ?forbidden_present,
                    "mod-list mismatch, admitting under warn policy"
                );
                Ok(())
            }
            ModControlPolicy::Enforce => Err(EngineError::ModIncompatible { missing_required, forbidden_present }),
        }
    }

    fn handle_leave(&mut self, session_id: u64) {
        let events = self.state.leave(session_id);
        self.dispatcher.unregister(session_id);
        router::broadcast_lock_events(&self.dispatcher, events);
        self.broadcast_label();
        metrics::CONNECTED_PLAYERS.dec();
    }

    fn broadcast_label(&self) {
        let _ = self.label_tx.send(self.state.label());
    }

    async fn tick(&mut self) {
        let start = Instant::now();
        let budget = Duration::from_secs_f64(1.0 / self.state.tick_hz as f64);

        let mut drained = Vec::new();
        while let Ok(envelope) = self.inbox.try_recv() {
            drained.push(envelope);
        }

        for envelope in drained {
            self.dispatch_one(envelope).await;
        }

        let advanced = self.state.warp.advance(budget.as_secs_f64());
        if self.state.tick_count % TIME_SYNC_TICK_INTERVAL == 0 {
            for (subspace_id, universe_time) in advanced {
                let sessions = self.state.warp.sessions_in_subspace(subspace_id);
                self.dispatcher
                    .broadcast_to(sessions, ServerMessage::time_sync(universe_time, self.state.tick_count));
            }
        }

        self.kick_idle_players();

        let now_ms = chrono::Utc::now().timestamp_millis();
        self.state.tombstones.sweep_if_due(Instant::now(), now_ms);

        self.state.tick_count += 1;
        metrics::TICKS_PROCESSED_TOTAL.inc();

        let elapsed = start.elapsed();
        metrics::TICK_LATENCY_SECONDS.observe(elapsed.as_secs_f64());
        if elapsed > budget * SLOW_TICK_BUDGET_MULTIPLIER {
            self.state.consecutive_slow_ticks += 1;
            metrics::TICK_OVERRUNS_TOTAL.inc();
            if self.state.consecutive_slow_ticks >= SLOW_TICK_DEGRADE_THRESHOLD && !self.state.degraded {
                self.state.degraded = true;
                warn!(match_id = %self.match_id, "match entering degraded mode after repeated tick overruns");
            }
        } else {
            self.state.consecutive_slow_ticks = 0;
            self.state.degraded = false;
        }
    }

    /// Kicks every player who hasn't sent anything in `IDLE_KICK_THRESHOLD`
    /// (spec §4.3). Kicking only enqueues the advisory and drops the
    /// transport; the player is removed from match state once the connection
    /// handler's `ConnectionGuard` reports the disconnect.
    fn kick_idle_players(&mut self) {
        let idle: Vec<u64> = self
            .state
            .players
            .values()
            .filter(|p| p.idle_for() >= IDLE_KICK_THRESHOLD)
            .map(|p| p.session_id)
            .collect();

        for session_id in idle {
            warn!(match_id = %self.match_id, session_id, "kicking idle player");
            self.dispatcher.kick(session_id, "idle timeout");
        }
    }

    /// Dispatches one inbound message, isolating any panic in its handler so
    /// one malformed message never brings down the whole match (spec §5).
    async fn dispatch_one(&mut self, envelope: Envelope) {
        let Envelope { session_id, frame, .. } = envelope;
        let parsed = ClientMessage::parse(frame.opcode, &frame.payload);
        let message = match parsed {
            Ok(m) => m,
            Err(err) => {
                metrics::MESSAGES_DROPPED_TOTAL.inc();
                warn!(session_id, %err, "dropping unparseable message");
                return;
            }
        };

        let state = &mut self.state;
        let dispatcher = &mut self.dispatcher;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| router::route(state, dispatcher, session_id, message)));

        match outcome {
            Ok(Some(intent)) => self.handle_asset_intent(session_id, intent).await,
            Ok(None) => {}
            Err(_) => {
                metrics::MESSAGES_DROPPED_TOTAL.inc();
                error!(session_id, "message handler panicked; message dropped, match continues");
            }
        }
    }

    async fn handle_asset_intent(&mut self, session_id: u64, intent: AssetIntent) {
        let Some(user_id) = self.state.players.get(&session_id).map(|p| p.user_id.clone()) else {
            return;
        };

        use crate::core::assets::kind::AssetKind;

        let result = match intent {
            AssetIntent::Craft(p) => self.run_asset_action(session_id, AssetKind::Craft, &user_id, p.action, &p.folder, &p.name, p.data.as_deref()).await,
            AssetIntent::Screenshot(p) => {
                self.run_asset_action(session_id, AssetKind::Screenshot, &user_id, p.action, &p.folder, &p.date_taken, p.data.as_deref()).await
            }
            AssetIntent::Flag(p) => self.run_asset_action(session_id, AssetKind::Flag, &user_id, p.action, &p.folder, &p.name, p.data.as_deref()).await,
            AssetIntent::Group(_) => Ok(()),
        };

        if let Err(err) = result {
            self.dispatcher.unicast(session_id, ServerMessage::advisory(&format!("asset operation failed: {err}")));
        }
    }

    async fn run_asset_action(
        &self,
        session_id: u64,
        kind: crate::core::assets::kind::AssetKind,
        owner: &str,
        action: crate::core::opcode::AssetAction,
        folder: &str,
        name: &str,
        data: Option<&str>,
    ) -> Result<(), EngineError> {
        use crate::core::assets::kind::{is_valid_flag_name, AssetKind};
        use crate::core::opcode::AssetAction;
        match action {
            AssetAction::Upload => {
                if kind == AssetKind::Flag && !is_valid_flag_name(name) {
                    return Err(EngineError::Protocol(format!("invalid flag name: {name}")));
                }
                let data = data.ok_or_else(|| EngineError::Protocol("upload missing data".into()))?;
                self.asset_broker.upload(kind, owner, folder, name, data).await?;
                self.dispatcher.unicast(session_id, ServerMessage::asset_notification(kind.opcode(), folder, name, false));
                Ok(())
            }
            AssetAction::Delete => {
                self.asset_broker.delete(kind, owner, folder, name).await?;
                self.dispatcher.unicast(session_id, ServerMessage::asset_notification(kind.opcode(), folder, name, true));
                Ok(())
            }
            AssetAction::DownloadRequest => {
                let stored = self.asset_broker.download(kind, owner, folder, name).await?;
                let Some(stored) = stored else {
                    return Err(EngineError::NotFound);
                };
                let data_b64 = base64::engine::general_purpose::STANDARD.encode(&stored.data);
                self.dispatcher.unicast(
                    session_id,
                    ServerMessage::asset_download(kind.opcode(), folder, name, &data_b64, stored.crc32),
                );
                Ok(())
            }
            AssetAction::ListFolders | AssetAction::ListItems => {
                let items = self.asset_broker.list_folder(kind, owner, folder).await?;
                self.dispatcher.unicast(session_id, ServerMessage::asset_list(kind.opcode(), folder, &items));
                Ok(())
            }
        }
    }

    async fn persist(&self) {
        let save = self.state.save();
        let Ok(encoded) = bincode::serde::encode_to_vec(&save, bincode::config::standard()) else {
            error!(match_id = %self.match_id, "failed to encode match save");
            return;
        };
        if let Err(err) = self
            .storage
            .put(collections::MATCH_SAVES, &self.match_id.to_string(), encoded)
            .await
        {
            error!(match_id = %self.match_id, %err, "failed to persist match save");
        }
    }
}
