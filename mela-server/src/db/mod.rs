//! Store abstraction
//!
//! [`MarketStore`] is the transactional boundary of the server. Each method
//! is atomic: multi-row writes (order + items + notifications + cart clear,
//! status change + notification) commit together or not at all.
//!
//! Two implementations:
//! - [`postgres::PgStore`]: sqlx over PostgreSQL (production)
//! - [`memory::MemoryStore`]: mutex-guarded maps (development, tests)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::models::{
    CartContents, CustomerProfile, NewOrder, Notification, NotificationDraft, Order,
    OrderLineRecord, OrderStatus, Product, ProductCreate, ProductFilter, ProductStatus,
    ProductUpdate, VendorProfile,
};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Kind of row a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Product,
    Order,
    CartItem,
    Notification,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Resource::Product => "Product",
            Resource::Order => "Order",
            Resource::CartItem => "Cart item",
            Resource::Notification => "Notification",
        })
    }
}

/// Store-layer error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Resource),

    /// Optimistic check failed: the row changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Row is referenced and cannot be deleted
    #[error("{0} is still referenced")]
    InUse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent marketplace state
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    // ========== Products ==========

    async fn insert_product(&self, vendor_id: &str, data: &ProductCreate) -> StoreResult<Product>;

    /// Update a product owned by `vendor_id` whose version equals `data.version`.
    ///
    /// `Conflict` when the vendor still owns the product but the version is
    /// stale, `NotFound` when the product is gone or owned by someone else.
    async fn update_product(
        &self,
        id: i64,
        vendor_id: &str,
        data: &ProductUpdate,
    ) -> StoreResult<Product>;

    /// `InUse` when any order line references the product
    async fn delete_product(&self, id: i64, vendor_id: &str) -> StoreResult<()>;

    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn set_product_status(&self, id: i64, status: ProductStatus) -> StoreResult<Product>;

    // ========== Profiles ==========

    async fn get_customer_profile(&self, user_id: &str) -> StoreResult<Option<CustomerProfile>>;

    async fn upsert_customer_profile(
        &self,
        profile: CustomerProfile,
    ) -> StoreResult<CustomerProfile>;

    async fn get_vendor_profile(&self, user_id: &str) -> StoreResult<Option<VendorProfile>>;

    async fn upsert_vendor_profile(&self, profile: VendorProfile) -> StoreResult<VendorProfile>;

    // ========== Cart ==========

    /// Cart with lines joined to products; `None` when the customer has no cart
    async fn load_cart(&self, customer_id: &str) -> StoreResult<Option<CartContents>>;

    /// Create the cart on first use, then increment or insert with quantity 1.
    /// Returns the new quantity.
    async fn add_cart_item(&self, customer_id: &str, product_id: i64) -> StoreResult<i32>;

    /// Decrement a line of the customer's cart, removing it at zero.
    /// Returns the remaining quantity (`None` once removed).
    async fn decrement_cart_item(&self, customer_id: &str, item_id: i64)
    -> StoreResult<Option<i32>>;

    async fn remove_cart_item(&self, customer_id: &str, item_id: i64) -> StoreResult<()>;

    // ========== Orders ==========

    /// Insert the order and its items, insert one notification per draft
    /// (each linked to the new order id) and clear the source cart.
    async fn place_order(
        &self,
        order: NewOrder,
        notifications: Vec<NotificationDraft>,
    ) -> StoreResult<(Order, Vec<Notification>)>;

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>>;

    /// Distinct vendor ids across the order's line items (empty for an
    /// unknown order)
    async fn order_vendor_ids(&self, order_id: i64) -> StoreResult<Vec<String>>;

    async fn list_customer_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>>;

    /// Orders with at least one line item of the vendor's products
    async fn list_vendor_orders(&self, vendor_id: &str) -> StoreResult<Vec<Order>>;

    /// Compare-and-set the status from `from` to `to` and record the
    /// notification in the same transaction.
    ///
    /// `Conflict` when the current status is no longer `from`.
    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        notification: NotificationDraft,
    ) -> StoreResult<(Order, Notification)>;

    async fn has_active_order(&self, customer_id: &str) -> StoreResult<bool>;

    // ========== Reporting ==========

    /// Order lines flattened for aggregation, optionally limited to a vendor
    async fn list_order_lines(&self, vendor_id: Option<&str>) -> StoreResult<Vec<OrderLineRecord>>;

    /// Distinct vendors owning at least one product
    async fn count_vendors(&self) -> StoreResult<i64>;

    // ========== Notifications ==========

    async fn insert_notification(&self, draft: NotificationDraft) -> StoreResult<Notification>;

    /// Newest first (created_at DESC, id DESC)
    async fn list_recent_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<Notification>>;

    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>>;

    /// Set `is_read`; idempotent
    async fn mark_notification_read(&self, id: i64) -> StoreResult<()>;
}
