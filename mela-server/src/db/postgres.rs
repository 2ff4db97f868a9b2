//! PostgreSQL store (sqlx)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{
    Cart, CartContents, CartLine, ContactSnapshot, CustomerProfile, NewOrder, Notification,
    NotificationDraft, Order, OrderItem, OrderLineRecord, OrderStatus, Product, ProductCreate,
    ProductFilter, ProductStatus, ProductUpdate, VendorProfile,
};
use shared::util::now;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use super::{MarketStore, Resource, StoreError, StoreResult};

const PRODUCT_COLUMNS: &str =
    "id, vendor_id, name, description, price, image_path, status, version";

const ORDER_COLUMNS: &str = "id, customer_id, created_at, contact_name, contact_address, \
     contact_phone, total_amount, status";

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, is_read, created_at, order_id";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: String,
    created_at: DateTime<Utc>,
    contact_name: String,
    contact_address: Option<String>,
    contact_phone: Option<String>,
    total_amount: Decimal,
    status: OrderStatus,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            created_at: self.created_at,
            contact: ContactSnapshot {
                name: self.contact_name,
                address: self.contact_address,
                phone: self.contact_phone,
            },
            total_amount: self.total_amount,
            status: self.status,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: i64,
    quantity: i32,
    #[sqlx(flatten)]
    product: Product,
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Attach line items to order rows, preserving row order
async fn with_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let items: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT order_id, product_id, quantity, unit_price FROM order_items
         WHERE order_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(OrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect())
}

async fn insert_notification_in(
    conn: &mut PgConnection,
    draft: NotificationDraft,
) -> StoreResult<Notification> {
    let notification = sqlx::query_as(&format!(
        "INSERT INTO notifications (user_id, message, is_read, created_at, order_id)
         VALUES ($1, $2, FALSE, $3, $4)
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(&draft.user_id)
    .bind(&draft.message)
    .bind(now())
    .bind(draft.order_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(notification)
}

/// sqlx-backed implementation of [`MarketStore`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Internal(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MarketStore for PgStore {
    // ========== Products ==========

    async fn insert_product(&self, vendor_id: &str, data: &ProductCreate) -> StoreResult<Product> {
        let product = sqlx::query_as(&format!(
            "INSERT INTO products (vendor_id, name, description, price, image_path, status, version)
             VALUES ($1, $2, $3, $4, $5, 'Pending', 1)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(vendor_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(&data.image_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        vendor_id: &str,
        data: &ProductUpdate,
    ) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<Product> = sqlx::query_as(&format!(
            "UPDATE products
             SET name = $1, description = $2, price = $3, image_path = $4, version = version + 1
             WHERE id = $5 AND vendor_id = $6 AND version = $7
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(&data.image_path)
        .bind(id)
        .bind(vendor_id)
        .bind(data.version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(product) = updated else {
            let owned: Option<i64> =
                sqlx::query_scalar("SELECT version FROM products WHERE id = $1 AND vendor_id = $2")
                    .bind(id)
                    .bind(vendor_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Err(match owned {
                Some(current) => StoreError::Conflict(format!(
                    "product {id} is at version {current}, update was based on {}",
                    data.version
                )),
                None => StoreError::NotFound(Resource::Product),
            });
        };

        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: i64, vendor_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND vendor_id = $2")
            .bind(id)
            .bind(vendor_id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound(Resource::Product)),
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(StoreError::InUse(format!("Product {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::TEXT IS NULL OR vendor_id = $1)
               AND ($2::product_status IS NULL OR status = $2)
             ORDER BY id"
        ))
        .bind(&filter.vendor_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn set_product_status(&self, id: i64, status: ProductStatus) -> StoreResult<Product> {
        let product: Option<Product> = sqlx::query_as(&format!(
            "UPDATE products SET status = $1, version = version + 1 WHERE id = $2
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        product.ok_or_else(|| StoreError::NotFound(Resource::Product))
    }

    // ========== Profiles ==========

    async fn get_customer_profile(&self, user_id: &str) -> StoreResult<Option<CustomerProfile>> {
        let profile = sqlx::query_as(
            "SELECT user_id, full_name, address, city, phone_number
             FROM customer_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn upsert_customer_profile(
        &self,
        profile: CustomerProfile,
    ) -> StoreResult<CustomerProfile> {
        let saved = sqlx::query_as(
            r#"
            INSERT INTO customer_profiles (user_id, full_name, address, city, phone_number)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id)
            DO UPDATE SET
                full_name = EXCLUDED.full_name, address = EXCLUDED.address,
                city = EXCLUDED.city, phone_number = EXCLUDED.phone_number
            RETURNING user_id, full_name, address, city, phone_number
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.full_name)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.phone_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn get_vendor_profile(&self, user_id: &str) -> StoreResult<Option<VendorProfile>> {
        let profile = sqlx::query_as(
            "SELECT user_id, shop_name, shop_address, contact_number, description, logo_path
             FROM vendor_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn upsert_vendor_profile(&self, profile: VendorProfile) -> StoreResult<VendorProfile> {
        let saved = sqlx::query_as(
            r#"
            INSERT INTO vendor_profiles
                (user_id, shop_name, shop_address, contact_number, description, logo_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id)
            DO UPDATE SET
                shop_name = EXCLUDED.shop_name, shop_address = EXCLUDED.shop_address,
                contact_number = EXCLUDED.contact_number, description = EXCLUDED.description,
                logo_path = EXCLUDED.logo_path
            RETURNING user_id, shop_name, shop_address, contact_number, description, logo_path
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.shop_name)
        .bind(&profile.shop_address)
        .bind(&profile.contact_number)
        .bind(&profile.description)
        .bind(&profile.logo_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    // ========== Cart ==========

    async fn load_cart(&self, customer_id: &str) -> StoreResult<Option<CartContents>> {
        let cart: Option<Cart> =
            sqlx::query_as("SELECT id, customer_id FROM carts WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(cart) = cart else {
            return Ok(None);
        };

        let rows: Vec<CartLineRow> = sqlx::query_as(
            r#"
            SELECT ci.id AS item_id, ci.quantity,
                   p.id, p.vendor_id, p.name, p.description, p.price, p.image_path,
                   p.status, p.version
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "#,
        )
        .bind(cart.id)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| CartLine {
                item_id: row.item_id,
                quantity: row.quantity,
                product: row.product,
            })
            .collect();
        Ok(Some(CartContents { cart, lines }))
    }

    async fn add_cart_item(&self, customer_id: &str, product_id: i64) -> StoreResult<i32> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(Resource::Product));
        }

        let cart_id: i64 = sqlx::query_scalar(
            "INSERT INTO carts (customer_id) VALUES ($1)
             ON CONFLICT (customer_id) DO UPDATE SET customer_id = EXCLUDED.customer_id
             RETURNING id",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        let quantity: i32 = sqlx::query_scalar(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, 1)
             ON CONFLICT (cart_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + 1
             RETURNING quantity",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(quantity)
    }

    async fn decrement_cart_item(
        &self,
        customer_id: &str,
        item_id: i64,
    ) -> StoreResult<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE cart_items ci SET quantity = ci.quantity - 1
            FROM carts c
            WHERE ci.id = $1 AND ci.cart_id = c.id AND c.customer_id = $2 AND ci.quantity > 1
            RETURNING ci.quantity
            "#,
        )
        .bind(item_id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?;

        if remaining.is_some() {
            tx.commit().await?;
            return Ok(remaining);
        }

        let deleted = sqlx::query(
            "DELETE FROM cart_items ci USING carts c
             WHERE ci.id = $1 AND ci.cart_id = c.id AND c.customer_id = $2",
        )
        .bind(item_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(Resource::CartItem));
        }

        tx.commit().await?;
        Ok(None)
    }

    async fn remove_cart_item(&self, customer_id: &str, item_id: i64) -> StoreResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM cart_items ci USING carts c
             WHERE ci.id = $1 AND ci.cart_id = c.id AND c.customer_id = $2",
        )
        .bind(item_id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(Resource::CartItem));
        }
        Ok(())
    }

    // ========== Orders ==========

    async fn place_order(
        &self,
        order: NewOrder,
        notifications: Vec<NotificationDraft>,
    ) -> StoreResult<(Order, Vec<Notification>)> {
        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (customer_id, created_at, contact_name, contact_address,
                                 contact_phone, total_amount, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'Pending')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.customer_id)
        .bind(order.created_at)
        .bind(&order.contact.name)
        .bind(&order.contact.address)
        .bind(&order.contact.phone)
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        let mut recorded = Vec::with_capacity(notifications.len());
        for draft in notifications {
            recorded.push(insert_notification_in(&mut tx, draft.for_order(row.id)).await?);
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(order.cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((row.into_order(order.items), recorded))
    }

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(with_items(&mut conn, vec![row]).await?.pop())
    }

    async fn order_vendor_ids(&self, order_id: i64) -> StoreResult<Vec<String>> {
        let vendors = sqlx::query_scalar(
            "SELECT DISTINCT p.vendor_id FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = $1
             ORDER BY p.vendor_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vendors)
    }

    async fn list_customer_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;
        with_items(&mut conn, rows).await
    }

    async fn list_vendor_orders(&self, vendor_id: &str) -> StoreResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             WHERE EXISTS (
                 SELECT 1 FROM order_items oi
                 JOIN products p ON p.id = oi.product_id
                 WHERE oi.order_id = o.id AND p.vendor_id = $1
             )
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(vendor_id)
        .fetch_all(&mut *conn)
        .await?;
        with_items(&mut conn, rows).await
    }

    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        notification: NotificationDraft,
    ) -> StoreResult<(Order, Notification)> {
        let mut tx = self.pool.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $1 WHERE id = $2 AND status = $3
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(to)
        .bind(order_id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let current: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Err(match current {
                Some(status) => StoreError::Conflict(format!(
                    "order {order_id} is {status}, expected {from}"
                )),
                None => StoreError::NotFound(Resource::Order),
            });
        };

        let recorded = insert_notification_in(&mut tx, notification).await?;
        let order = with_items(&mut tx, vec![row])
            .await?
            .pop()
            .ok_or_else(|| StoreError::Internal(format!("order {order_id} vanished")))?;

        tx.commit().await?;
        Ok((order, recorded))
    }

    async fn has_active_order(&self, customer_id: &str) -> StoreResult<bool> {
        let active = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM orders
                 WHERE customer_id = $1 AND status IN ('Pending', 'InProcess')
             )",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    // ========== Reporting ==========

    async fn list_order_lines(&self, vendor_id: Option<&str>) -> StoreResult<Vec<OrderLineRecord>> {
        let lines = sqlx::query_as(
            r#"
            SELECT o.id AS order_id, o.customer_id, o.status,
                   (o.created_at AT TIME ZONE 'UTC')::date AS order_date,
                   p.id AS product_id, p.name AS product_name, p.vendor_id,
                   oi.quantity, oi.unit_price
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE ($1::TEXT IS NULL OR p.vendor_id = $1)
            ORDER BY o.id, oi.id
            "#,
        )
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn count_vendors(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(DISTINCT vendor_id) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ========== Notifications ==========

    async fn insert_notification(&self, draft: NotificationDraft) -> StoreResult<Notification> {
        let mut conn = self.pool.acquire().await?;
        insert_notification_in(&mut conn, draft).await
    }

    async fn list_recent_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>> {
        let notification = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(Resource::Notification));
        }
        Ok(())
    }
}
