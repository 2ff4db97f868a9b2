//! Live push protocol
//!
//! Server → client messages sent over `GET /api/live/ws`. The channel
//! carries one event type with a plain text payload; the durable
//! notification list is the reconciliation path for missed pushes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server → client push message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum LiveMessage {
    /// Notification text for the connected user or group
    ReceiveNotification(String),
}

impl LiveMessage {
    pub fn notification(text: impl Into<String>) -> Self {
        Self::ReceiveNotification(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::ReceiveNotification(text) => text,
        }
    }
}

/// Role-scoped broadcast group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum LiveGroup {
    #[default]
    Admins,
    Vendors,
    Customers,
}

impl LiveGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admins => "Admins",
            Self::Vendors => "Vendors",
            Self::Customers => "Customers",
        }
    }
}

impl fmt::Display for LiveGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin broadcast payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// Target group, `Admins` when omitted
    #[serde(default)]
    pub group: Option<LiveGroup>,
    pub message: String,
}
