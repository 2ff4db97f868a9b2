//! Cart service
//!
//! Cart edits and checkout for one customer are serialized through
//! [`CustomerLocks`], so concurrent "add" requests cannot lose an increment
//! and checkout never sees a half-edited cart.

use dashmap::DashMap;
use rust_decimal::Decimal;
use shared::models::{CartView, CurrentUser, Role};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::MarketStore;
use crate::error::ServiceResult;

/// Per-customer async mutexes
///
/// An entry lives only while some task holds or waits for it.
#[derive(Clone, Default)]
pub struct CustomerLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the customer's cart
    pub async fn lock(&self, customer_id: &str) -> CustomerGuard {
        let mutex = self
            .locks
            .entry(customer_id.to_string())
            .or_default()
            .clone();
        CustomerGuard {
            guard: Some(mutex.lock_owned().await),
            customer_id: customer_id.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Customers with a held or awaited lock
    pub fn active_count(&self) -> usize {
        self.locks.len()
    }
}

/// Releases the customer's lock on drop and forgets the entry once nobody
/// else references it
pub struct CustomerGuard {
    guard: Option<OwnedMutexGuard<()>>,
    customer_id: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for CustomerGuard {
    fn drop(&mut self) {
        // the guard owns a clone of the mutex Arc, release it first
        self.guard.take();
        self.locks
            .remove_if(&self.customer_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn MarketStore>,
    locks: CustomerLocks,
}

impl CartService {
    pub fn new(store: Arc<dyn MarketStore>, locks: CustomerLocks) -> Self {
        Self { store, locks }
    }

    /// Add one unit of a product, creating the cart on first use.
    /// Returns the line's new quantity.
    pub async fn add(&self, caller: &CurrentUser, product_id: i64) -> ServiceResult<i32> {
        caller.require(Role::Customer)?;
        let _guard = self.locks.lock(&caller.id).await;
        let quantity = self.store.add_cart_item(&caller.id, product_id).await?;
        tracing::debug!(customer_id = %caller.id, product_id, quantity, "Cart item added");
        Ok(quantity)
    }

    /// Remove one unit; the line disappears at zero
    pub async fn remove_one(&self, caller: &CurrentUser, item_id: i64) -> ServiceResult<Option<i32>> {
        caller.require(Role::Customer)?;
        let _guard = self.locks.lock(&caller.id).await;
        Ok(self.store.decrement_cart_item(&caller.id, item_id).await?)
    }

    /// Remove the whole line
    pub async fn remove_all(&self, caller: &CurrentUser, item_id: i64) -> ServiceResult<()> {
        caller.require(Role::Customer)?;
        let _guard = self.locks.lock(&caller.id).await;
        Ok(self.store.remove_cart_item(&caller.id, item_id).await?)
    }

    pub async fn view(&self, caller: &CurrentUser) -> ServiceResult<CartView> {
        caller.require(Role::Customer)?;
        let lines = self
            .store
            .load_cart(&caller.id)
            .await?
            .map(|c| c.lines)
            .unwrap_or_default();
        let total: Decimal = lines.iter().map(|l| l.line_total()).sum();
        let has_active_order = self.store.has_active_order(&caller.id).await?;
        Ok(CartView {
            lines,
            total,
            has_active_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shared::error::{AppError, ErrorCode};
    use shared::models::ProductCreate;

    async fn setup() -> (CartService, i64) {
        let store = Arc::new(MemoryStore::new());
        let product = store
            .insert_product(
                "v1",
                &ProductCreate {
                    name: "Injera".into(),
                    description: None,
                    price: Decimal::new(250, 2),
                    image_path: None,
                },
            )
            .await
            .unwrap();
        (CartService::new(store, CustomerLocks::new()), product.id)
    }

    fn customer(id: &str) -> CurrentUser {
        CurrentUser::new(id, id, vec![Role::Customer])
    }

    #[tokio::test]
    async fn view_reports_lines_and_total() {
        let (carts, product_id) = setup().await;
        let c = customer("c1");

        let empty = carts.view(&c).await.unwrap();
        assert!(empty.lines.is_empty());
        assert_eq!(empty.total, Decimal::ZERO);
        assert!(!empty.has_active_order);

        carts.add(&c, product_id).await.unwrap();
        assert_eq!(carts.add(&c, product_id).await.unwrap(), 2);

        let view = carts.view(&c).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total, Decimal::new(500, 2));

        let item = view.lines[0].item_id;
        assert_eq!(carts.remove_one(&c, item).await.unwrap(), Some(1));
        assert_eq!(carts.remove_one(&c, item).await.unwrap(), None);
        assert!(carts.view(&c).await.unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let (carts, product_id) = setup().await;
        let c = customer("c1");

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let carts = carts.clone();
                let c = c.clone();
                tokio::spawn(async move { carts.add(&c, product_id).await.unwrap() })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        let view = carts.view(&c).await.unwrap();
        assert_eq!(view.lines[0].quantity, 20);
        assert_eq!(carts.locks.active_count(), 0);
    }

    #[tokio::test]
    async fn lock_table_forgets_idle_customers() {
        let locks = CustomerLocks::new();
        for i in 0..50 {
            let _guard = locks.lock(&format!("c{i}")).await;
            assert_eq!(locks.active_count(), 1);
        }
        assert_eq!(locks.active_count(), 0);
    }

    #[tokio::test]
    async fn waiting_customer_keeps_entry_alive() {
        let locks = CustomerLocks::new();
        let first = locks.lock("c1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("c1").await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // releasing the first holder must not drop the entry the waiter uses
        drop(first);
        assert_eq!(locks.active_count(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.active_count(), 0);
    }

    #[tokio::test]
    async fn only_customers_use_carts() {
        let (carts, product_id) = setup().await;
        let vendor = CurrentUser::new("v1", "Shop", vec![Role::Vendor]);
        let err = AppError::from(carts.add(&vendor, product_id).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::RoleRequired);
    }

    #[tokio::test]
    async fn items_of_other_carts_are_invisible() {
        let (carts, product_id) = setup().await;
        carts.add(&customer("c1"), product_id).await.unwrap();
        let item = carts.view(&customer("c1")).await.unwrap().lines[0].item_id;

        carts.add(&customer("c2"), product_id).await.unwrap();
        let err = AppError::from(carts.remove_all(&customer("c2"), item).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::CartItemNotFound);
    }
}
