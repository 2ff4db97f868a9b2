//! Order Model
//!
//! An order is an immutable priced snapshot of a cart. Only `status`
//! changes after creation, and only along `Pending → InProcess → Delivered`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartLine;

/// Order lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status"))]
pub enum OrderStatus {
    Pending,
    InProcess,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::InProcess,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProcess => "InProcess",
            Self::Delivered => "Delivered",
        }
    }

    /// Still awaiting fulfilment
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProcess)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vendor-driven status change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderTransition {
    Accept,
    Deliver,
}

impl OrderTransition {
    /// Required current status
    pub fn from_status(&self) -> OrderStatus {
        match self {
            Self::Accept => OrderStatus::Pending,
            Self::Deliver => OrderStatus::InProcess,
        }
    }

    pub fn to_status(&self) -> OrderStatus {
        match self {
            Self::Accept => OrderStatus::InProcess,
            Self::Deliver => OrderStatus::Delivered,
        }
    }

    /// Validate against the current status, returning the target status
    pub fn apply(&self, current: OrderStatus) -> Option<OrderStatus> {
        (current == self.from_status()).then(|| self.to_status())
    }

    /// Message sent to the customer once the transition commits
    pub fn customer_message(&self, order_id: i64) -> String {
        match self {
            Self::Accept => format!("Your order #{order_id} has been accepted!"),
            Self::Deliver => format!("Your order #{order_id} has been delivered!"),
        }
    }
}

/// Order line: product reference plus price fixed at order time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Contact details copied into the order at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContactSnapshot {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Persisted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
    pub contact: ContactSnapshot,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Σ quantity × unit_price over the line items
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Order about to be inserted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: String,
    pub cart_id: i64,
    pub created_at: DateTime<Utc>,
    pub contact: ContactSnapshot,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
}

/// What checkout would place, without placing it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPreview {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub contact: ContactSnapshot,
}

/// Result of checkout. An empty cart is an outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "order", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    Placed(Order),
    EmptyCart,
}

impl CheckoutOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Placed(order) => Some(order),
            Self::EmptyCart => None,
        }
    }
}
