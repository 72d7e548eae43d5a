// src/core/match_engine/dispatcher.rs

//! The `Dispatcher` (spec §4.2): fans outbound `ServerMessage`s to connected
//! sessions. Purely a registry of channels; it owns no game state.

use indexmap::IndexMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::core::message::ServerMessage;

#[derive(Debug, Default)]
pub struct Dispatcher {
    outboxes: IndexMap<u64, UnboundedSender<ServerMessage>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session_id: u64, sender: UnboundedSender<ServerMessage>) {
        self.outboxes.insert(session_id, sender);
    }

    pub fn unregister(&mut self, session_id: u64) {
        self.outboxes.shift_remove(&session_id);
    }

    pub fn unicast(&self, session_id: u64, message: ServerMessage) {
        if let Some(tx) = self.outboxes.get(&session_id) {
            if tx.send(message).is_err() {
                trace!(session_id, "dropped unicast to a session whose connection already closed");
            }
        }
    }

    pub fn broadcast(&self, message: ServerMessage) {
        for tx in self.outboxes.values() {
            let _ = tx.send(message.clone());
        }
    }

    pub fn broadcast_except(&self, except: u64, message: ServerMessage) {
        for (session_id, tx) in &self.outboxes {
            if *session_id == except {
                continue;
            }
            let _ = tx.send(message.clone());
        }
    }

    pub fn broadcast_to(&self, sessions: impl IntoIterator<Item = u64>, message: ServerMessage) {
        for session_id in sessions {
            self.unicast(session_id, message.clone());
        }
    }

    pub fn connected_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Enqueues an advisory message then drops the session's outbox sender.
    /// The connection handler's relay loop observes the resulting closed
    /// channel and tears down the socket after flushing what's queued.
    pub fn kick(&mut self, session_id: u64, reason: &str) {
        self.unicast(session_id, ServerMessage::advisory(&format!("kicked: {reason}")));
        self.unregister(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kick_sends_an_advisory_then_closes_the_channel() {
        let mut dispatcher = Dispatcher::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        dispatcher.register(1, tx);

        dispatcher.kick(1, "idle too long");

        let advisory = rx.try_recv().expect("advisory queued before the channel closes");
        assert_eq!(advisory.opcode, crate::core::opcode::codes::SETTINGS);
        assert_eq!(rx.try_recv(), Err(tokio::sync::mpsc::error::TryRecvError::Disconnected));
        assert_eq!(dispatcher.connected_count(), 0);
    }
}
