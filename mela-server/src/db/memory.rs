//! In-memory store
//!
//! All tables live behind one mutex, so every trait method is trivially
//! atomic. Used when `DATABASE_URL` is unset in development and by tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{
    Cart, CartContents, CartLine, CustomerProfile, NewOrder, Notification, NotificationDraft,
    Order, OrderLineRecord, OrderStatus, Product, ProductCreate, ProductFilter, ProductStatus,
    ProductUpdate, VendorProfile,
};
use shared::util::now;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{MarketStore, Resource, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct CartItemRow {
    id: i64,
    cart_id: i64,
    product_id: i64,
    quantity: i32,
}

#[derive(Debug, Default)]
struct Sequences {
    product: i64,
    cart: i64,
    cart_item: i64,
    order: i64,
    notification: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    products: BTreeMap<i64, Product>,
    customer_profiles: HashMap<String, CustomerProfile>,
    vendor_profiles: HashMap<String, VendorProfile>,
    /// customer_id → cart
    carts: HashMap<String, Cart>,
    cart_items: BTreeMap<i64, CartItemRow>,
    orders: BTreeMap<i64, Order>,
    notifications: BTreeMap<i64, Notification>,
}

impl Tables {
    fn insert_notification(&mut self, draft: NotificationDraft) -> Notification {
        let notification = Notification {
            id: next(&mut self.seq.notification),
            user_id: draft.user_id,
            message: draft.message,
            is_read: false,
            created_at: now(),
            order_id: draft.order_id,
        };
        self.notifications
            .insert(notification.id, notification.clone());
        notification
    }

    fn order_vendor_ids(&self, order: &Order) -> BTreeSet<String> {
        order
            .items
            .iter()
            .filter_map(|item| self.products.get(&item.product_id))
            .map(|p| p.vendor_id.clone())
            .collect()
    }

    /// Cart item belonging to the customer's cart
    fn owned_cart_item(&self, customer_id: &str, item_id: i64) -> StoreResult<&CartItemRow> {
        let cart = self
            .carts
            .get(customer_id)
            .ok_or_else(|| StoreError::NotFound(Resource::CartItem))?;
        self.cart_items
            .get(&item_id)
            .filter(|row| row.cart_id == cart.id)
            .ok_or_else(|| StoreError::NotFound(Resource::CartItem))
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Mutex-guarded in-memory implementation of [`MarketStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_product(&self, vendor_id: &str, data: &ProductCreate) -> StoreResult<Product> {
        let mut t = self.tables.lock();
        let product = Product {
            id: next(&mut t.seq.product),
            vendor_id: vendor_id.to_string(),
            name: data.name.clone(),
            description: data.description.clone(),
            price: data.price,
            image_path: data.image_path.clone(),
            status: ProductStatus::Pending,
            version: 1,
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        vendor_id: &str,
        data: &ProductUpdate,
    ) -> StoreResult<Product> {
        let mut t = self.tables.lock();
        let product = t
            .products
            .get_mut(&id)
            .filter(|p| p.vendor_id == vendor_id)
            .ok_or_else(|| StoreError::NotFound(Resource::Product))?;
        if product.version != data.version {
            return Err(StoreError::Conflict(format!(
                "product {id} is at version {}, update was based on {}",
                product.version, data.version
            )));
        }
        product.name = data.name.clone();
        product.description = data.description.clone();
        product.price = data.price;
        product.image_path = data.image_path.clone();
        product.version += 1;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: i64, vendor_id: &str) -> StoreResult<()> {
        let mut t = self.tables.lock();
        if !t.products.get(&id).is_some_and(|p| p.vendor_id == vendor_id) {
            return Err(StoreError::NotFound(Resource::Product));
        }
        let referenced = t
            .orders
            .values()
            .any(|o| o.items.iter().any(|i| i.product_id == id));
        if referenced {
            return Err(StoreError::InUse(format!("Product {id}")));
        }
        t.products.remove(&id);
        t.cart_items.retain(|_, row| row.product_id != id);
        Ok(())
    }

    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let t = self.tables.lock();
        Ok(t.products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn set_product_status(&self, id: i64, status: ProductStatus) -> StoreResult<Product> {
        let mut t = self.tables.lock();
        let product = t
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(Resource::Product))?;
        product.status = status;
        product.version += 1;
        Ok(product.clone())
    }

    async fn get_customer_profile(&self, user_id: &str) -> StoreResult<Option<CustomerProfile>> {
        Ok(self.tables.lock().customer_profiles.get(user_id).cloned())
    }

    async fn upsert_customer_profile(
        &self,
        profile: CustomerProfile,
    ) -> StoreResult<CustomerProfile> {
        let mut t = self.tables.lock();
        t.customer_profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn get_vendor_profile(&self, user_id: &str) -> StoreResult<Option<VendorProfile>> {
        Ok(self.tables.lock().vendor_profiles.get(user_id).cloned())
    }

    async fn upsert_vendor_profile(&self, profile: VendorProfile) -> StoreResult<VendorProfile> {
        let mut t = self.tables.lock();
        t.vendor_profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn load_cart(&self, customer_id: &str) -> StoreResult<Option<CartContents>> {
        let t = self.tables.lock();
        let Some(cart) = t.carts.get(customer_id) else {
            return Ok(None);
        };
        let lines = t
            .cart_items
            .values()
            .filter(|row| row.cart_id == cart.id)
            .filter_map(|row| {
                t.products.get(&row.product_id).map(|product| CartLine {
                    item_id: row.id,
                    quantity: row.quantity,
                    product: product.clone(),
                })
            })
            .collect();
        Ok(Some(CartContents {
            cart: cart.clone(),
            lines,
        }))
    }

    async fn add_cart_item(&self, customer_id: &str, product_id: i64) -> StoreResult<i32> {
        let mut t = self.tables.lock();
        if !t.products.contains_key(&product_id) {
            return Err(StoreError::NotFound(Resource::Product));
        }
        let existing = t.carts.get(customer_id).map(|cart| cart.id);
        let cart_id = match existing {
            Some(id) => id,
            None => {
                let cart = Cart {
                    id: next(&mut t.seq.cart),
                    customer_id: customer_id.to_string(),
                };
                let id = cart.id;
                t.carts.insert(customer_id.to_string(), cart);
                id
            }
        };
        if let Some(row) = t
            .cart_items
            .values_mut()
            .find(|row| row.cart_id == cart_id && row.product_id == product_id)
        {
            row.quantity += 1;
            return Ok(row.quantity);
        }
        let id = next(&mut t.seq.cart_item);
        t.cart_items.insert(
            id,
            CartItemRow {
                id,
                cart_id,
                product_id,
                quantity: 1,
            },
        );
        Ok(1)
    }

    async fn decrement_cart_item(
        &self,
        customer_id: &str,
        item_id: i64,
    ) -> StoreResult<Option<i32>> {
        let mut t = self.tables.lock();
        let quantity = t.owned_cart_item(customer_id, item_id)?.quantity;
        if quantity > 1 {
            if let Some(row) = t.cart_items.get_mut(&item_id) {
                row.quantity -= 1;
            }
            Ok(Some(quantity - 1))
        } else {
            t.cart_items.remove(&item_id);
            Ok(None)
        }
    }

    async fn remove_cart_item(&self, customer_id: &str, item_id: i64) -> StoreResult<()> {
        let mut t = self.tables.lock();
        t.owned_cart_item(customer_id, item_id)?;
        t.cart_items.remove(&item_id);
        Ok(())
    }

    async fn place_order(
        &self,
        order: NewOrder,
        notifications: Vec<NotificationDraft>,
    ) -> StoreResult<(Order, Vec<Notification>)> {
        let mut t = self.tables.lock();
        if let Some(missing) = order
            .items
            .iter()
            .find(|i| !t.products.contains_key(&i.product_id))
        {
            tracing::debug!(product_id = missing.product_id, "Order references unknown product");
            return Err(StoreError::NotFound(Resource::Product));
        }

        let placed = Order {
            id: next(&mut t.seq.order),
            customer_id: order.customer_id,
            created_at: order.created_at,
            contact: order.contact,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            items: order.items,
        };
        t.orders.insert(placed.id, placed.clone());

        let recorded = notifications
            .into_iter()
            .map(|draft| t.insert_notification(draft.for_order(placed.id)))
            .collect();

        t.cart_items.retain(|_, row| row.cart_id != order.cart_id);
        Ok((placed, recorded))
    }

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        Ok(self.tables.lock().orders.get(&id).cloned())
    }

    async fn order_vendor_ids(&self, order_id: i64) -> StoreResult<Vec<String>> {
        let t = self.tables.lock();
        Ok(t.orders
            .get(&order_id)
            .map(|order| t.order_vendor_ids(order).into_iter().collect())
            .unwrap_or_default())
    }

    async fn list_customer_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>> {
        let t = self.tables.lock();
        let mut orders: Vec<Order> = t
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_vendor_orders(&self, vendor_id: &str) -> StoreResult<Vec<Order>> {
        let t = self.tables.lock();
        let mut orders: Vec<Order> = t
            .orders
            .values()
            .filter(|o| t.order_vendor_ids(o).contains(vendor_id))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        notification: NotificationDraft,
    ) -> StoreResult<(Order, Notification)> {
        let mut t = self.tables.lock();
        let order = t
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(Resource::Order))?;
        if order.status != from {
            return Err(StoreError::Conflict(format!(
                "order {order_id} is {}, expected {from}",
                order.status
            )));
        }
        order.status = to;
        let updated = order.clone();
        let recorded = t.insert_notification(notification);
        Ok((updated, recorded))
    }

    async fn has_active_order(&self, customer_id: &str) -> StoreResult<bool> {
        let t = self.tables.lock();
        Ok(t
            .orders
            .values()
            .any(|o| o.customer_id == customer_id && o.status.is_active()))
    }

    async fn list_order_lines(&self, vendor_id: Option<&str>) -> StoreResult<Vec<OrderLineRecord>> {
        let t = self.tables.lock();
        let mut lines = Vec::new();
        for order in t.orders.values() {
            for item in &order.items {
                let Some(product) = t.products.get(&item.product_id) else {
                    continue;
                };
                if vendor_id.is_some_and(|v| v != product.vendor_id) {
                    continue;
                }
                lines.push(OrderLineRecord {
                    order_id: order.id,
                    customer_id: order.customer_id.clone(),
                    status: order.status,
                    order_date: order.created_at.date_naive(),
                    product_id: product.id,
                    product_name: product.name.clone(),
                    vendor_id: product.vendor_id.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                });
            }
        }
        Ok(lines)
    }

    async fn count_vendors(&self) -> StoreResult<i64> {
        let t = self.tables.lock();
        let vendors: BTreeSet<&str> = t.products.values().map(|p| p.vendor_id.as_str()).collect();
        Ok(vendors.len() as i64)
    }

    async fn insert_notification(&self, draft: NotificationDraft) -> StoreResult<Notification> {
        Ok(self.tables.lock().insert_notification(draft))
    }

    async fn list_recent_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let t = self.tables.lock();
        let mut found: Vec<Notification> = t
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>> {
        Ok(self.tables.lock().notifications.get(&id).cloned())
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let notification = t
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(Resource::Notification))?;
        notification.is_read = true;
        Ok(())
    }
}
