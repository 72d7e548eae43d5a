// tests/common/mod.rs

//! Drives a real `MatchActor` over its actual channel boundary (the same one
//! `ConnectionHandler` uses), without opening a socket. This exercises the
//! tick loop, router, and persistence exactly as production traffic would.

use std::sync::Arc;
use std::time::Duration;

use aetherlink::config::{ModControl, ModControlPolicy};
use aetherlink::core::assets::broker::AssetBroker;
use aetherlink::core::codec::Frame;
use aetherlink::core::errors::EngineError;
use aetherlink::core::match_engine::lifecycle::{ControlMessage, Envelope, JoinRequest, MatchActor, MatchConfig, MatchHandle};
use aetherlink::core::match_engine::warp::WarpMode;
use aetherlink::core::message::ServerMessage;
use aetherlink::core::registry::bans::BanList;
use aetherlink::core::storage::adapter::StorageAdapter;
use aetherlink::core::storage::file_store::FileStorageAdapter;
use serde::Serialize;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub struct Harness {
    pub handle: MatchHandle,
    pub bans: Arc<BanList>,
    _data_dir: TempDir,
}

impl Harness {
    pub async fn spawn(max_players: usize, tick_hz: u32, warp_mode: WarpMode, password: Option<&str>) -> Self {
        Self::spawn_with_auto_promote(max_players, tick_hz, warp_mode, password, true).await
    }

    pub async fn spawn_with_auto_promote(
        max_players: usize,
        tick_hz: u32,
        warp_mode: WarpMode,
        password: Option<&str>,
        auto_promote_first_joiner: bool,
    ) -> Self {
        Self::spawn_with_mod_control(max_players, tick_hz, warp_mode, password, auto_promote_first_joiner, ModControlPolicy::Off, ModControl::default()).await
    }

    pub async fn spawn_with_mod_control(
        max_players: usize,
        tick_hz: u32,
        warp_mode: WarpMode,
        password: Option<&str>,
        auto_promote_first_joiner: bool,
        mod_control: ModControlPolicy,
        mod_manifest: ModControl,
    ) -> Self {
        let data_dir = tempfile::tempdir().expect("tempdir");
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(FileStorageAdapter::open(data_dir.path()).await.expect("open storage"));
        let asset_broker = Arc::new(AssetBroker::new(storage.clone()));
        let bans = Arc::new(BanList::new(storage.clone()));

        let handle = MatchActor::spawn(
            MatchConfig {
                server_name: "test-match".to_string(),
                password: password.map(str::to_string),
                max_players,
                tick_hz,
                warp_mode,
                auto_promote_first_joiner,
                mod_control,
                mod_manifest: Arc::new(mod_manifest),
            },
            storage,
            asset_broker,
            bans.clone(),
        );

        Self { handle, bans, _data_dir: data_dir }
    }

    /// Joins a session, returning its outbox (every broadcast/unicast it receives).
    pub async fn join(
        &self,
        session_id: u64,
        user_id: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<mpsc::UnboundedReceiver<ServerMessage>, EngineError> {
        self.join_with_mods(session_id, user_id, username, password, Vec::new()).await
    }

    pub async fn join_with_mods(
        &self,
        session_id: u64,
        user_id: &str,
        username: &str,
        password: Option<&str>,
        mods: Vec<String>,
    ) -> Result<mpsc::UnboundedReceiver<ServerMessage>, EngineError> {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();

        self.handle
            .control
            .send(ControlMessage::Join(JoinRequest {
                session_id,
                user_id: user_id.to_string(),
                username: username.to_string(),
                password: password.map(str::to_string),
                mods,
                outbox: outbox_tx,
                reply: reply_tx,
            }))
            .await
            .expect("match actor alive");

        reply_rx.await.expect("join reply delivered")?;
        Ok(outbox_rx)
    }

    pub async fn leave(&self, session_id: u64) {
        let _ = self.handle.control.send(ControlMessage::Leave(session_id)).await;
    }

    /// Sends a decoded client message into the match as `session_id`/`user_id`.
    pub async fn send(&self, session_id: u64, user_id: &str, opcode: u16, payload: &impl Serialize) {
        let bytes = serde_json::to_vec(payload).expect("serialize payload");
        let envelope = Envelope {
            session_id,
            user_id: user_id.to_string(),
            frame: Frame::new(opcode, bytes),
        };
        self.handle.inbox.send(envelope).await.expect("match actor alive");
    }

    pub fn label(&self) -> serde_json::Value {
        self.handle.label.borrow().clone()
    }
}

/// Waits briefly for a message rather than hanging forever if the match
/// never produces one (e.g. because a request was silently rejected).
pub async fn recv(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Option<ServerMessage> {
    timeout(Duration::from_millis(500), rx.recv()).await.unwrap_or(None)
}

/// Drains every message currently queued, waiting only long enough for one
/// tick to process them.
pub async fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    loop {
        match timeout(Duration::from_millis(150), rx.recv()).await {
            Ok(Some(msg)) => out.push(msg),
            _ => break,
        }
    }
    out
}
