//! Order engine
//!
//! The single place where orders are created and change status.
//!
//! ```text
//! checkout:  lock(customer) → load cart → price + snapshot contact
//!            → store.place_order(order, items, vendor notices, clear cart)
//!            → unlock → queue live pushes
//! accept / deliver:
//!            vendor owns a line? → strict state guard
//!            → store.transition_order(CAS status, customer notice)
//!            → queue live push
//! ```
//!
//! Pushes are queued strictly after the store call commits; a push never
//! affects the outcome of the operation.

mod error;

pub use error::{OrderError, OrderResult};

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CartContents, CheckoutOutcome, CheckoutPreview, ContactSnapshot, CurrentUser, NewOrder,
    NotificationDraft, Order, OrderItem, OrderTransition, Role,
};
use shared::util::now;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cart::CustomerLocks;
use crate::db::{MarketStore, StoreError};
use crate::notify::NotificationDispatcher;

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn MarketStore>,
    dispatcher: NotificationDispatcher,
    locks: CustomerLocks,
}

impl OrderEngine {
    pub fn new(
        store: Arc<dyn MarketStore>,
        dispatcher: NotificationDispatcher,
        locks: CustomerLocks,
    ) -> Self {
        Self {
            store,
            dispatcher,
            locks,
        }
    }

    /// Contact details for a new order: the customer profile, or just the
    /// account display name when no profile exists
    async fn contact_for(&self, caller: &CurrentUser) -> OrderResult<ContactSnapshot> {
        Ok(self
            .store
            .get_customer_profile(&caller.id)
            .await?
            .map(|p| p.contact())
            .unwrap_or_else(|| ContactSnapshot {
                name: caller.display_name.clone(),
                ..Default::default()
            }))
    }

    async fn non_empty_cart(&self, caller: &CurrentUser) -> OrderResult<Option<CartContents>> {
        Ok(self
            .store
            .load_cart(&caller.id)
            .await?
            .filter(|c| !c.is_empty()))
    }

    /// What `create_order` would place right now
    pub async fn checkout_preview(&self, caller: &CurrentUser) -> OrderResult<CheckoutPreview> {
        caller.require(Role::Customer)?;
        let cart = self
            .non_empty_cart(caller)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CartEmpty))?;
        Ok(CheckoutPreview {
            total: cart.total(),
            contact: self.contact_for(caller).await?,
            lines: cart.lines,
        })
    }

    /// Turn the caller's cart into a `Pending` order.
    ///
    /// An empty or missing cart yields [`CheckoutOutcome::EmptyCart`] with
    /// no store mutation and no notification. Otherwise each distinct
    /// vendor among the lines receives one new-order notification.
    pub async fn create_order(&self, caller: &CurrentUser) -> OrderResult<CheckoutOutcome> {
        caller.require(Role::Customer)?;

        let guard = self.locks.lock(&caller.id).await;

        let Some(cart) = self.non_empty_cart(caller).await? else {
            tracing::debug!(customer_id = %caller.id, "Checkout with empty cart");
            return Ok(CheckoutOutcome::EmptyCart);
        };

        let contact = self.contact_for(caller).await?;

        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product.id,
                quantity: line.quantity,
                unit_price: line.product.price,
            })
            .collect();
        let total_amount: Decimal = items.iter().map(OrderItem::line_total).sum();

        let vendors: BTreeSet<&str> = cart
            .lines
            .iter()
            .map(|line| line.product.vendor_id.as_str())
            .collect();
        let drafts: Vec<NotificationDraft> = vendors
            .into_iter()
            .map(|vendor_id| NotificationDraft::new_order(vendor_id, &contact.name))
            .collect();

        let new_order = NewOrder {
            customer_id: caller.id.clone(),
            cart_id: cart.cart.id,
            created_at: now(),
            contact,
            total_amount,
            items,
        };

        let (order, notifications) = self.store.place_order(new_order, drafts).await?;
        drop(guard);

        tracing::info!(
            order_id = order.id,
            customer_id = %order.customer_id,
            total = %order.total_amount,
            vendors = notifications.len(),
            "Order placed"
        );

        self.dispatcher.publish_all(&notifications);
        Ok(CheckoutOutcome::Placed(order))
    }

    /// `Pending → InProcess`
    pub async fn accept(&self, caller: &CurrentUser, order_id: i64) -> OrderResult<Order> {
        self.transition(caller, order_id, OrderTransition::Accept)
            .await
    }

    /// `InProcess → Delivered`
    pub async fn deliver(&self, caller: &CurrentUser, order_id: i64) -> OrderResult<Order> {
        self.transition(caller, order_id, OrderTransition::Deliver)
            .await
    }

    /// Apply a vendor transition and notify the customer.
    ///
    /// Only a vendor owning at least one line may act. The prior status is
    /// checked strictly, so repeating a transition fails with
    /// `InvalidTransition`; losing a race to a concurrent transition fails
    /// with `Conflict`.
    pub async fn transition(
        &self,
        caller: &CurrentUser,
        order_id: i64,
        transition: OrderTransition,
    ) -> OrderResult<Order> {
        caller.require(Role::Vendor)?;

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let vendors = self.store.order_vendor_ids(order_id).await?;
        if !vendors.iter().any(|v| *v == caller.id) {
            return Err(OrderError::NotOrderVendor(order_id));
        }

        let Some(target) = transition.apply(order.status) else {
            return Err(OrderError::InvalidTransition {
                order_id,
                transition,
                current: order.status,
            });
        };

        let draft = NotificationDraft::new(
            order.customer_id.clone(),
            transition.customer_message(order_id),
        )
        .for_order(order_id);

        let (updated, notification) = self
            .store
            .transition_order(order_id, order.status, target, draft)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => OrderError::Conflict(order_id),
                StoreError::NotFound(_) => OrderError::OrderNotFound(order_id),
                other => other.into(),
            })?;

        tracing::info!(
            order_id,
            vendor_id = %caller.id,
            from = %order.status,
            to = %updated.status,
            "Order status changed"
        );

        self.dispatcher.publish(&notification);
        Ok(updated)
    }

    /// One of the caller's own orders
    pub async fn customer_order(&self, caller: &CurrentUser, order_id: i64) -> OrderResult<Order> {
        caller.require(Role::Customer)?;
        self.store
            .get_order(order_id)
            .await?
            .filter(|o| o.customer_id == caller.id)
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Caller's order history, newest first
    pub async fn customer_orders(&self, caller: &CurrentUser) -> OrderResult<Vec<Order>> {
        caller.require(Role::Customer)?;
        Ok(self.store.list_customer_orders(&caller.id).await?)
    }

    /// Orders containing at least one of the caller's products
    pub async fn vendor_orders(&self, caller: &CurrentUser) -> OrderResult<Vec<Order>> {
        caller.require(Role::Vendor)?;
        Ok(self.store.list_vendor_orders(&caller.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::notify::PushJob;
    use shared::models::{CustomerProfile, OrderStatus, ProductCreate};
    use tokio::sync::mpsc;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: OrderEngine,
        dispatcher: NotificationDispatcher,
        push_rx: mpsc::Receiver<PushJob>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let (dispatcher, push_rx) = NotificationDispatcher::new(store.clone(), 64);
        let engine = OrderEngine::new(store.clone(), dispatcher.clone(), CustomerLocks::new());
        Fixture {
            store,
            engine,
            dispatcher,
            push_rx,
        }
    }

    fn customer() -> CurrentUser {
        CurrentUser::new("c1", "Chidi", vec![Role::Customer])
    }

    fn vendor(id: &str) -> CurrentUser {
        CurrentUser::new(id, id, vec![Role::Vendor])
    }

    async fn product(store: &MemoryStore, vendor_id: &str, price: Decimal) -> i64 {
        store
            .insert_product(
                vendor_id,
                &ProductCreate {
                    name: format!("{vendor_id}-dish"),
                    description: None,
                    price,
                    image_path: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn add(store: &MemoryStore, product_id: i64, times: usize) {
        for _ in 0..times {
            store.add_cart_item("c1", product_id).await.unwrap();
        }
    }

    fn drain(rx: &mut mpsc::Receiver<PushJob>) -> Vec<PushJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    async fn place(f: &Fixture) -> Order {
        match f.engine.create_order(&customer()).await.unwrap() {
            CheckoutOutcome::Placed(order) => order,
            CheckoutOutcome::EmptyCart => panic!("Expected an order"),
        }
    }

    #[tokio::test]
    async fn two_vendor_cart_scenario() {
        let mut f = fixture();
        let a = product(&f.store, "v1", Decimal::from(5)).await;
        let b = product(&f.store, "v2", Decimal::from(10)).await;
        add(&f.store, a, 2).await;
        add(&f.store, b, 1).await;

        let order = place(&f).await;
        assert_eq!(order.total_amount, Decimal::from(20));
        assert_eq!(order.total_amount, order.items_total());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.contact.name, "Chidi");

        let cart = f.store.load_cart("c1").await.unwrap().unwrap();
        assert!(cart.lines.is_empty());

        for v in ["v1", "v2"] {
            let notes = f.store.list_recent_notifications(v, 10).await.unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].message, "📦 New order received from Chidi");
            assert_eq!(notes[0].order_id, Some(order.id));
        }

        let pushed: Vec<String> = drain(&mut f.push_rx)
            .into_iter()
            .map(|job| match job {
                PushJob::User { user_id, .. } => user_id,
                other => panic!("Unexpected {other:?}"),
            })
            .collect();
        assert_eq!(pushed, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn one_notification_per_distinct_vendor() {
        let f = fixture();
        for price in [1, 2, 3] {
            let p = product(&f.store, "v1", Decimal::from(price)).await;
            add(&f.store, p, 1).await;
        }
        let other = product(&f.store, "v2", Decimal::from(4)).await;
        add(&f.store, other, 1).await;

        let order = place(&f).await;
        assert_eq!(order.items.len(), 4);
        assert_eq!(
            f.store.list_recent_notifications("v1", 10).await.unwrap().len(),
            1
        );
        assert_eq!(
            f.store.list_recent_notifications("v2", 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn empty_cart_is_a_no_op() {
        let mut f = fixture();
        // no cart at all
        assert!(matches!(
            f.engine.create_order(&customer()).await.unwrap(),
            CheckoutOutcome::EmptyCart
        ));

        // cart emptied by hand
        let p = product(&f.store, "v1", Decimal::from(3)).await;
        add(&f.store, p, 1).await;
        let item = f.store.load_cart("c1").await.unwrap().unwrap().lines[0].item_id;
        f.store.remove_cart_item("c1", item).await.unwrap();

        assert!(matches!(
            f.engine.create_order(&customer()).await.unwrap(),
            CheckoutOutcome::EmptyCart
        ));
        assert!(f.store.list_customer_orders("c1").await.unwrap().is_empty());
        assert!(f.store.list_recent_notifications("v1", 10).await.unwrap().is_empty());
        assert!(drain(&mut f.push_rx).is_empty());
    }

    #[tokio::test]
    async fn unit_price_is_fixed_at_checkout() {
        let f = fixture();
        let p = product(&f.store, "v1", Decimal::new(550, 2)).await;
        add(&f.store, p, 2).await;
        let order = place(&f).await;

        let current = f.store.get_product(p).await.unwrap().unwrap();
        f.store
            .update_product(
                p,
                "v1",
                &shared::models::ProductUpdate {
                    name: current.name,
                    description: None,
                    price: Decimal::from(99),
                    image_path: None,
                    version: current.version,
                },
            )
            .await
            .unwrap();

        let stored = f.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].unit_price, Decimal::new(550, 2));
        assert_eq!(stored.total_amount, Decimal::new(1100, 2));
    }

    #[tokio::test]
    async fn contact_comes_from_profile() {
        let f = fixture();
        f.store
            .upsert_customer_profile(CustomerProfile {
                user_id: "c1".into(),
                full_name: "Chidi Anagonye".into(),
                address: Some("12 Market St".into()),
                city: Some("Accra".into()),
                phone_number: Some("555-0101".into()),
            })
            .await
            .unwrap();
        let p = product(&f.store, "v1", Decimal::from(3)).await;
        add(&f.store, p, 1).await;

        let preview = f.engine.checkout_preview(&customer()).await.unwrap();
        assert_eq!(preview.total, Decimal::from(3));
        assert_eq!(preview.contact.address.as_deref(), Some("12 Market St"));

        let order = place(&f).await;
        assert_eq!(order.contact, preview.contact);
        let notes = f.store.list_recent_notifications("v1", 10).await.unwrap();
        assert_eq!(notes[0].message, "📦 New order received from Chidi Anagonye");
    }

    #[tokio::test]
    async fn preview_of_empty_cart_signals_cart_empty() {
        let f = fixture();
        let err = AppError::from(f.engine.checkout_preview(&customer()).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[tokio::test]
    async fn accept_then_deliver_notifies_customer_twice() {
        let mut f = fixture();
        let p = product(&f.store, "v1", Decimal::from(5)).await;
        add(&f.store, p, 1).await;
        let order = place(&f).await;
        drain(&mut f.push_rx);

        let accepted = f.engine.accept(&vendor("v1"), order.id).await.unwrap();
        assert_eq!(accepted.status, OrderStatus::InProcess);
        let notes = f.dispatcher.list_recent(&customer(), None).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(
            notes[0].message,
            format!("Your order #{} has been accepted!", order.id)
        );
        assert_eq!(notes[0].order_id, Some(order.id));

        let delivered = f.engine.deliver(&vendor("v1"), order.id).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        let notes = f.dispatcher.list_recent(&customer(), None).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(
            notes[0].message,
            format!("Your order #{} has been delivered!", order.id)
        );

        let pushed = drain(&mut f.push_rx);
        assert_eq!(pushed.len(), 2);
    }

    #[tokio::test]
    async fn transitions_are_strict() {
        let f = fixture();
        let p = product(&f.store, "v1", Decimal::from(5)).await;
        add(&f.store, p, 1).await;
        let order = place(&f).await;

        // deliver before accept
        let err = AppError::from(f.engine.deliver(&vendor("v1"), order.id).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        f.engine.accept(&vendor("v1"), order.id).await.unwrap();

        // repeated accept is rejected and does not re-notify
        let err = AppError::from(f.engine.accept(&vendor("v1"), order.id).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(
            f.store.list_recent_notifications("c1", 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn only_order_vendors_may_transition() {
        let f = fixture();
        let p = product(&f.store, "v1", Decimal::from(5)).await;
        product(&f.store, "v2", Decimal::from(5)).await;
        add(&f.store, p, 1).await;
        let order = place(&f).await;

        let err = AppError::from(f.engine.accept(&vendor("v2"), order.id).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::NotOrderVendor);

        let err = AppError::from(f.engine.accept(&customer(), order.id).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::RoleRequired);

        let err = AppError::from(f.engine.accept(&vendor("v1"), 9999).await.unwrap_err());
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn concurrent_accepts_yield_one_winner() {
        let f = fixture();
        let p = product(&f.store, "v1", Decimal::from(5)).await;
        add(&f.store, p, 1).await;
        let order = place(&f).await;

        let v1 = vendor("v1");
        let (a, b) = tokio::join!(
            f.engine.accept(&v1, order.id),
            f.engine.accept(&v1, order.id)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let loser = AppError::from(a.err().or(b.err()).unwrap());
        assert!(matches!(
            loser.code,
            ErrorCode::InvalidTransition | ErrorCode::ConcurrencyConflict
        ));
        assert_eq!(
            f.store.list_recent_notifications("c1", 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn customers_see_only_their_orders() {
        let f = fixture();
        let p = product(&f.store, "v1", Decimal::from(5)).await;
        add(&f.store, p, 1).await;
        let order = place(&f).await;

        assert_eq!(
            f.engine.customer_order(&customer(), order.id).await.unwrap(),
            order
        );
        let stranger = CurrentUser::new("c2", "Eleanor", vec![Role::Customer]);
        let err = AppError::from(
            f.engine
                .customer_order(&stranger, order.id)
                .await
                .unwrap_err(),
        );
        assert_eq!(err.code, ErrorCode::OrderNotFound);

        assert_eq!(f.engine.customer_orders(&customer()).await.unwrap().len(), 1);
        assert_eq!(f.engine.vendor_orders(&vendor("v1")).await.unwrap().len(), 1);
        assert!(f.engine.vendor_orders(&vendor("v2")).await.unwrap().is_empty());
    }
}
