//! Live operator session gateway.
//!
//! Each socket gets a [`Connection`] that moves `Connecting → Joined → Closed`.
//! A joined connection holds a bus subscription for its site; on every event
//! it forwards the event and then recomputes its own unread count.

use std::future;
use std::sync::Arc;

use database::{chat, user, Database};
use tracing::{debug, info, instrument, warn};

use crate::bus::{FanoutBus, FanoutEvent, Subscription};
use crate::error::GatewayError;
use crate::protocol::{ClientFrame, ServerFrame};
use crate::session::{ConnectionId, SessionState, SessionTable};

/// A live operator connection. Dropping it removes it from the session table.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    operator_id: String,
    sessions: Arc<SessionTable>,
    subscription: Option<Subscription>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }

    /// Site this connection currently receives events for.
    pub fn joined_site(&self) -> Option<&str> {
        self.subscription.as_ref().map(Subscription::tenant_id)
    }

    pub fn state(&self) -> SessionState {
        self.sessions
            .state(self.id)
            .unwrap_or(SessionState::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.sessions.remove(self.id);
    }
}

/// Joins operators to tenant rooms and pushes events and unread counts.
pub struct LiveGateway {
    db: Database,
    bus: Arc<dyn FanoutBus>,
    sessions: Arc<SessionTable>,
}

impl LiveGateway {
    pub fn new(db: Database, bus: Arc<dyn FanoutBus>) -> Self {
        Self::with_sessions(db, bus, Arc::new(SessionTable::new()))
    }

    pub fn with_sessions(db: Database, bus: Arc<dyn FanoutBus>, sessions: Arc<SessionTable>) -> Self {
        Self { db, bus, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// Register a new connection for an authenticated operator.
    pub fn connect(&self, operator_id: &str) -> Connection {
        let id = self.sessions.open(operator_id);
        debug!(connection_id = id, operator_id, "Connection opened");
        Connection {
            id,
            operator_id: operator_id.to_string(),
            sessions: Arc::clone(&self.sessions),
            subscription: None,
        }
    }

    /// Join a site's room, replacing any previous membership.
    ///
    /// On rejection the connection keeps its previous room.
    #[instrument(skip(self, conn), fields(connection_id = conn.id, operator_id = %conn.operator_id))]
    pub async fn join(&self, conn: &mut Connection, site_id: &str) -> Result<(), GatewayError> {
        if conn.state() == SessionState::Closed {
            return Err(GatewayError::Closed);
        }

        if !user::has_site_access(self.db.pool(), site_id, &conn.operator_id).await? {
            warn!(site_id, "Join rejected");
            return Err(GatewayError::Forbidden {
                site_id: site_id.to_string(),
            });
        }

        let joined = SessionState::Joined {
            site_id: site_id.to_string(),
        };
        if !self.sessions.transition(conn.id, joined) {
            return Err(GatewayError::Closed);
        }
        conn.subscription = Some(self.bus.subscribe(site_id));

        info!(site_id, "Operator joined site");
        Ok(())
    }

    /// Unread conversation count for the site this connection joined.
    pub async fn get_unread_count(&self, conn: &Connection, site_id: &str) -> Result<i64, GatewayError> {
        match conn.state() {
            SessionState::Closed => return Err(GatewayError::Closed),
            SessionState::Joined { site_id: joined } if joined == site_id => {}
            _ => {
                return Err(GatewayError::NotJoined {
                    site_id: site_id.to_string(),
                })
            }
        }

        Ok(chat::unread_conversation_count(self.db.pool(), site_id).await?)
    }

    /// Announce a new visitor message to every operator watching the site.
    #[instrument(skip(self))]
    pub async fn broadcast_new_message(
        &self,
        site_id: &str,
        conversation_id: &str,
        visitor_name: Option<&str>,
    ) {
        let event = FanoutEvent::NewMessage {
            conversation_id: conversation_id.to_string(),
            visitor_name: visitor_name.map(str::to_string),
        };
        self.bus.publish(site_id, event).await;
    }

    /// Close the connection. Terminal; drops the bus subscription.
    pub fn close(&self, conn: &mut Connection) {
        self.sessions.transition(conn.id, SessionState::Closed);
        conn.subscription = None;
        debug!(connection_id = conn.id, "Connection closed");
    }

    /// Apply one client frame and produce the reply for this connection only.
    pub async fn handle_frame(&self, conn: &mut Connection, frame: ClientFrame) -> ServerFrame {
        match frame {
            ClientFrame::Join { site_id } => match self.join(conn, &site_id).await {
                Ok(()) => ServerFrame::Joined { site_id },
                Err(e) => ServerFrame::error(e.to_string()),
            },
            ClientFrame::GetUnreadCount { site_id } => {
                match self.get_unread_count(conn, &site_id).await {
                    Ok(count) => ServerFrame::UnreadCountUpdate { count },
                    Err(e) => ServerFrame::error(e.to_string()),
                }
            }
        }
    }

    /// Wait for the next bus event and return the frames to push: the event
    /// followed by this connection's fresh unread count.
    ///
    /// Pends forever while the connection is not joined.
    pub async fn next_frames(&self, conn: &mut Connection) -> Vec<ServerFrame> {
        let Some(subscription) = conn.subscription.as_mut() else {
            return future::pending().await;
        };

        let Some(event) = subscription.recv().await else {
            warn!(connection_id = conn.id, "Bus closed, dropping subscription");
            conn.subscription = None;
            return future::pending().await;
        };

        let site_id = subscription.tenant_id().to_string();
        let mut frames = vec![ServerFrame::from(event)];

        match chat::unread_conversation_count(self.db.pool(), &site_id).await {
            Ok(count) => frames.push(ServerFrame::UnreadCountUpdate { count }),
            Err(e) => warn!(site_id = %site_id, error = %e, "Failed to recompute unread count"),
        }

        frames
    }
}
