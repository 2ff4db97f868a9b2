//! Unified error codes for the Mela marketplace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Cart errors
//! - 4xxx: Order errors
//! - 5xxx: Notification errors
//! - 6xxx: Product errors
//! - 7xxx: Profile errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Specific role required
    RoleRequired = 2002,
    /// Caller owns no line item of the order
    NotOrderVendor = 2101,
    /// Notification belongs to another user
    NotNotificationOwner = 2102,

    // ==================== 3xxx: Cart ====================
    /// Cart item not found
    CartItemNotFound = 3002,
    /// Cart has no items
    CartEmpty = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Status transition not allowed from the current state
    InvalidTransition = 4002,
    /// Concurrent modification detected
    ConcurrencyConflict = 4003,

    // ==================== 5xxx: Notification ====================
    /// Notification not found
    NotificationNotFound = 5001,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is referenced by existing orders
    ProductInUse = 6003,

    // ==================== 7xxx: Profile ====================
    /// Profile not found
    ProfileNotFound = 7001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Too many concurrent resources (e.g. live connections)
    ResourceLimitExceeded = 9501,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::NotOrderVendor => "Order contains none of your products",
            ErrorCode::NotNotificationOwner => "Notification belongs to another user",

            // Cart
            ErrorCode::CartItemNotFound => "Cart item not found",
            ErrorCode::CartEmpty => "Cart is empty",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Order status transition is not allowed",
            ErrorCode::ConcurrencyConflict => "Resource was modified concurrently",

            // Notification
            ErrorCode::NotificationNotFound => "Notification not found",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInUse => "Product is referenced by existing orders",

            // Profile
            ErrorCode::ProfileNotFound => "Profile not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ResourceLimitExceeded => "Resource limit exceeded",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2002 => Ok(ErrorCode::RoleRequired),
            2101 => Ok(ErrorCode::NotOrderVendor),
            2102 => Ok(ErrorCode::NotNotificationOwner),

            // Cart
            3002 => Ok(ErrorCode::CartItemNotFound),
            3003 => Ok(ErrorCode::CartEmpty),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidTransition),
            4003 => Ok(ErrorCode::ConcurrencyConflict),

            // Notification
            5001 => Ok(ErrorCode::NotificationNotFound),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6003 => Ok(ErrorCode::ProductInUse),

            // Profile
            7001 => Ok(ErrorCode::ProfileNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9501 => Ok(ErrorCode::ResourceLimitExceeded),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
