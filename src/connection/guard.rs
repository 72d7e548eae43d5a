// src/connection/guard.rs

//! `ConnectionGuard`: an RAII guard that tells the match actor a session has
//! gone away, no matter which path out of `ConnectionHandler::run` was taken.

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::match_engine::lifecycle::ControlMessage;

pub struct ConnectionGuard {
    session_id: u64,
    control: mpsc::Sender<ControlMessage>,
    left: bool,
}

impl ConnectionGuard {
    pub fn new(session_id: u64, control: mpsc::Sender<ControlMessage>) -> Self {
        Self { session_id, control, left: false }
    }

    /// Marks the session as already cleaned up, so `Drop` doesn't double-send.
    pub fn mark_left(&mut self) {
        self.left = true;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.left {
            return;
        }
        // `Drop` can't await; a bounded `try_send` is the non-blocking escape
        // hatch the tick loop's inbox already has to tolerate a full channel.
        if self.control.try_send(ControlMessage::Leave(self.session_id)).is_err() {
            debug!(session_id = self.session_id, "match actor inbox full or gone on disconnect cleanup");
        }
    }
}
