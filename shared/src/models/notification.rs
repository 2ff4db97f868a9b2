//! Notification Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable notification record. Only `is_read` ever changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: i64,
    /// Recipient user id (weak reference)
    pub user_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Order this notification is about, if any
    pub order_id: Option<i64>,
}

/// Notification not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: String,
    pub message: String,
    pub order_id: Option<i64>,
}

impl NotificationDraft {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            order_id: None,
        }
    }

    pub fn for_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// New-order text sent to each vendor in an order
    pub fn new_order(vendor_id: impl Into<String>, customer_name: &str) -> Self {
        Self::new(vendor_id, format!("📦 New order received from {customer_name}"))
    }
}

/// Query for the recent-notifications endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}
