//! Data models
//!
//! Shared between mela-server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Entity ids are `i64` (BIGSERIAL); user ids are opaque strings issued by
//! the identity provider.

pub mod cart;
pub mod dashboard;
pub mod notification;
pub mod order;
pub mod product;
pub mod profile;
pub mod user;

// Re-exports
pub use cart::*;
pub use dashboard::*;
pub use notification::*;
pub use order::*;
pub use product::*;
pub use profile::*;
pub use user::*;
