//! Registry of live operator connections in this process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Process-unique connection identifier.
pub type ConnectionId = u64;

/// Lifecycle of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not yet in a tenant room.
    Connecting,
    /// Receiving events for one tenant.
    Joined { site_id: String },
    /// Terminal.
    Closed,
}

/// Snapshot of a connection's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub operator_id: String,
    pub state: SessionState,
}

/// Connection ID to session state, owned by the gateway.
#[derive(Debug, Default)]
pub struct SessionTable {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection in `Connecting`.
    pub fn open(&self, operator_id: &str) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            id,
            Session {
                operator_id: operator_id.to_string(),
                state: SessionState::Connecting,
            },
        );
        id
    }

    pub fn get(&self, id: ConnectionId) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).cloned()
    }

    pub fn state(&self, id: ConnectionId) -> Option<SessionState> {
        self.get(id).map(|s| s.state)
    }

    /// Move a connection to a new state. `Closed` is never left; returns
    /// `false` if the connection is unknown or already closed.
    pub fn transition(&self, id: ConnectionId, state: SessionState) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(&id) {
            Some(session) if session.state != SessionState::Closed => {
                session.state = state;
                true
            }
            _ => false,
        }
    }

    /// Forget a connection entirely.
    pub fn remove(&self, id: ConnectionId) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&id)
    }

    /// Number of connections currently joined to `site_id`.
    pub fn joined_count(&self, site_id: &str) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .values()
            .filter(|s| matches!(&s.state, SessionState::Joined { site_id: joined } if joined == site_id))
            .count()
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
