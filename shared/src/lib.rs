//! Shared types for the Mela marketplace
//!
//! Domain models, the unified error system and the live-push protocol,
//! used by the server and by any Rust client talking to it.

pub mod error;
pub mod live;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use live::LiveMessage;
