// src/connection/handler.rs

//! `ConnectionHandler`: manages the full lifecycle of one TCP client, from
//! handshake through frame relay to cleanup (spec §1's reference transport).

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::core::codec::{Frame, MatchFrameCodec};
use crate::core::errors::EngineError;
use crate::core::match_engine::lifecycle::{Envelope, JoinRequest};
use crate::core::message::ServerMessage;
use crate::core::opcode::codes;
use crate::core::registry::discovery::MatchRegistry;

use super::guard::ConnectionGuard;
use super::session::SessionState;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct HandshakeRequest {
    user_id: String,
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    mods: Vec<String>,
}

pub struct ConnectionHandler {
    framed: Framed<TcpStream, MatchFrameCodec>,
    addr: SocketAddr,
    session_id: u64,
    registry: MatchRegistry,
    default_match_id: uuid::Uuid,
    global_shutdown_rx: broadcast::Receiver<()>,
    session: SessionState,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        session_id: u64,
        registry: MatchRegistry,
        default_match_id: uuid::Uuid,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, MatchFrameCodec),
            addr,
            session_id,
            registry,
            default_match_id,
            global_shutdown_rx,
            session: SessionState::new(),
        }
    }

    pub async fn run(&mut self) -> Result<(), EngineError> {
        let first_frame = match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(frame))) if frame.opcode == codes::HANDSHAKE => frame,
            Ok(Some(Ok(_))) => return Err(EngineError::Protocol("first frame must be HANDSHAKE".into())),
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => return Err(EngineError::Protocol("connection closed before handshake".into())),
            Err(_) => return Err(EngineError::Protocol("handshake timed out".into())),
        };

        let handshake: HandshakeRequest = serde_json::from_slice(&first_frame.payload)?;
        self.session.user_id = Some(handshake.user_id.clone());
        self.session.username = Some(handshake.username.clone());

        let Some(match_handle) = self.registry.get(self.default_match_id) else {
            return Err(EngineError::NotFound);
        };

        let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let join_request = JoinRequest {
            session_id: self.session_id,
            user_id: handshake.user_id.clone(),
            username: handshake.username.clone(),
            password: handshake.password.clone(),
            mods: handshake.mods.clone(),
            outbox: outbox_tx,
            reply: reply_tx,
        };

        match_handle
            .control
            .send(crate::core::match_engine::lifecycle::ControlMessage::Join(join_request))
            .await
            .map_err(|_| EngineError::Internal("match actor unreachable".into()))?;

        reply_rx
            .await
            .map_err(|_| EngineError::Internal("match actor dropped the join reply".into()))??;

        self.session.authenticated = true;
        self.session.joined_match = Some(self.default_match_id);
        info!(session_id = self.session_id, addr = %self.addr, "player joined match");

        let mut guard = ConnectionGuard::new(self.session_id, match_handle.control.clone());

        loop {
            tokio::select! {
                biased;

                _ = self.global_shutdown_rx.recv() => {
                    let _ = self.framed.send(Frame::new(codes::SETTINGS, Vec::new())).await;
                    break;
                }

                outbound = outbox_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if self.framed.send(message.into_frame()).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                inbound = self.framed.next() => {
                    match inbound {
                        Some(Ok(frame)) => {
                            let envelope = Envelope { session_id: self.session_id, user_id: handshake.user_id.clone(), frame };
                            if match_handle.inbox.send(envelope).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(session_id = self.session_id, %e, "connection error");
                            break;
                        }
                        None => {
                            debug!(session_id = self.session_id, "connection closed by peer");
                            break;
                        }
                    }
                }
            }
        }

        drop(guard);
        Ok(())
    }
}
