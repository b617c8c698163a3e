//! JSON frames exchanged with operator sockets.

use serde::{Deserialize, Serialize};

use crate::bus::FanoutEvent;

/// Frames sent by the operator client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join { site_id: String },
    GetUnreadCount { site_id: String },
}

/// Frames sent to the operator client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "joined")]
    Joined { site_id: String },
    #[serde(rename = "chat:new_message")]
    NewMessage {
        conversation_id: String,
        visitor_name: Option<String>,
    },
    #[serde(rename = "unread_count_update")]
    UnreadCountUpdate { count: i64 },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<FanoutEvent> for ServerFrame {
    fn from(event: FanoutEvent) -> Self {
        match event {
            FanoutEvent::NewMessage {
                conversation_id,
                visitor_name,
            } => Self::NewMessage {
                conversation_id,
                visitor_name,
            },
        }
    }
}
