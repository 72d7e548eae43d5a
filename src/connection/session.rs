// src/connection/session.rs

//! Per-connection session bookkeeping that exists below the match: identity
//! claimed at the handshake, before the connection has joined a match.

#[derive(Debug, Clone)]
pub struct SessionState {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub authenticated: bool,
    pub joined_match: Option<uuid::Uuid>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            user_id: None,
            username: None,
            authenticated: false,
            joined_match: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
