//! mela-server: multi-vendor food marketplace backend
//!
//! - Product catalog with admin approval
//! - Per-customer carts and multi-vendor checkout
//! - Order lifecycle (Pending → InProcess → Delivered)
//! - Durable notifications with best-effort live push over WebSocket

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod live;
pub mod logger;
pub mod notify;
pub mod orders;
pub mod state;

pub use config::Config;
pub use state::AppState;
