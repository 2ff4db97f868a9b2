//! End-to-end flow through the service layer: cart, checkout, vendor
//! transitions, durable notifications and live push.

use mela_server::db::{MarketStore, MemoryStore};
use mela_server::live::LiveConnection;
use mela_server::{AppState, Config};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::live::LiveGroup;
use shared::models::{
    CheckoutOutcome, CurrentUser, OrderStatus, ProductCreate, ProductStatus, Role,
};
use std::sync::Arc;
use std::time::Duration;

fn user(id: &str, role: Role) -> CurrentUser {
    CurrentUser::new(id, id, vec![role])
}

fn start() -> AppState {
    let store: Arc<dyn MarketStore> = Arc::new(MemoryStore::new());
    let (state, push_rx) = AppState::new(Config::development(), store);
    tokio::spawn(state.push_worker().run(push_rx));
    state
}

async fn approved_product(state: &AppState, vendor: &str, name: &str, price: i64) -> i64 {
    let product = state
        .store
        .insert_product(
            vendor,
            &ProductCreate {
                name: name.to_string(),
                description: None,
                price: Decimal::from(price),
                image_path: None,
            },
        )
        .await
        .unwrap();
    state
        .store
        .set_product_status(product.id, ProductStatus::Approved)
        .await
        .unwrap();
    product.id
}

async fn next_text(connection: &mut LiveConnection) -> String {
    tokio::time::timeout(Duration::from_secs(2), connection.recv())
        .await
        .expect("push not delivered in time")
        .expect("connection closed")
        .text()
        .to_string()
}

#[tokio::test]
async fn order_lifecycle_notifies_everyone() {
    let state = start();
    let customer = user("alice", Role::Customer);
    let v1 = user("v1", Role::Vendor);
    let v2 = user("v2", Role::Vendor);

    let injera = approved_product(&state, "v1", "Injera", 5).await;
    let tibs = approved_product(&state, "v2", "Tibs", 10).await;

    let mut v1_live = state.live.connect(&v1).unwrap();
    assert_eq!(v1_live.open(), Some(LiveGroup::Vendors));
    let mut v2_live = state.live.connect(&v2).unwrap();
    v2_live.open();
    let mut customer_live = state.live.connect(&customer).unwrap();
    customer_live.open();

    state.carts.add(&customer, injera).await.unwrap();
    state.carts.add(&customer, injera).await.unwrap();
    state.carts.add(&customer, tibs).await.unwrap();

    let cart = state.carts.view(&customer).await.unwrap();
    assert_eq!(cart.total, Decimal::from(20));
    assert!(!cart.has_active_order);

    let order = match state.orders.create_order(&customer).await.unwrap() {
        CheckoutOutcome::Placed(order) => order,
        CheckoutOutcome::EmptyCart => panic!("cart was not empty"),
    };
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::from(20));
    assert_eq!(order.items_total(), order.total_amount);

    assert!(next_text(&mut v1_live).await.contains("alice"));
    assert!(next_text(&mut v2_live).await.contains("alice"));

    let cart = state.carts.view(&customer).await.unwrap();
    assert!(cart.lines.is_empty());
    assert!(cart.has_active_order);

    let accepted = state.orders.accept(&v1, order.id).await.unwrap();
    assert_eq!(accepted.status, OrderStatus::InProcess);
    assert_eq!(
        next_text(&mut customer_live).await,
        format!("Your order #{} has been accepted!", order.id)
    );

    // second vendor on the same order cannot accept again
    let err = AppError::from(state.orders.accept(&v2, order.id).await.unwrap_err());
    assert_eq!(err.code, ErrorCode::InvalidTransition);

    let delivered = state.orders.deliver(&v2, order.id).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(
        next_text(&mut customer_live).await,
        format!("Your order #{} has been delivered!", order.id)
    );

    let recent = state
        .notifications
        .list_recent(&customer, None)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].message.contains("delivered"));
    assert!(recent.iter().all(|n| n.order_id == Some(order.id)));

    let vendor_report = state.dashboards.vendor(&v1).await.unwrap();
    assert_eq!(vendor_report.delivered_revenue, Decimal::from(10));

    let admin = user("root", Role::Admin);
    let admin_report = state.dashboards.admin(&admin).await.unwrap();
    assert_eq!(admin_report.total_orders, 1);
    assert_eq!(admin_report.total_vendors, 2);
    assert_eq!(admin_report.delivered_revenue, Decimal::from(20));
}

#[tokio::test]
async fn offline_users_reconcile_from_notification_list() {
    let state = start();
    let customer = user("bob", Role::Customer);
    let vendor = user("v1", Role::Vendor);
    let product = approved_product(&state, "v1", "Shiro", 4).await;

    state.carts.add(&customer, product).await.unwrap();
    let order = state
        .orders
        .create_order(&customer)
        .await
        .unwrap()
        .order()
        .cloned()
        .unwrap();
    state.orders.accept(&vendor, order.id).await.unwrap();

    // nobody was connected; the durable record is still there
    let vendor_inbox = state.notifications.list_recent(&vendor, None).await.unwrap();
    assert_eq!(vendor_inbox.len(), 1);
    let customer_inbox = state
        .notifications
        .list_recent(&customer, None)
        .await
        .unwrap();
    assert_eq!(customer_inbox.len(), 1);

    let read = state
        .notifications
        .mark_read(&customer, customer_inbox[0].id)
        .await
        .unwrap();
    assert!(read.is_read);
}

#[tokio::test]
async fn admin_broadcast_reaches_group_only() {
    let state = start();
    let admin = user("root", Role::Admin);
    let vendor = user("v1", Role::Vendor);

    let mut admin_live = state.live.connect(&admin).unwrap();
    admin_live.open();
    let mut vendor_live = state.live.connect(&vendor).unwrap();
    vendor_live.open();

    state.notifications.broadcast(LiveGroup::Admins, "maintenance at noon");
    assert_eq!(next_text(&mut admin_live).await, "maintenance at noon");

    state.notifications.broadcast(LiveGroup::Vendors, "new fee schedule");
    assert_eq!(next_text(&mut vendor_live).await, "new fee schedule");

    // admin did not get the vendor broadcast
    let extra = tokio::time::timeout(Duration::from_millis(100), admin_live.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test]
async fn closed_connection_stops_receiving() {
    let state = start();
    let customer = user("carol", Role::Customer);

    let mut live = state.live.connect(&customer).unwrap();
    live.open();
    assert_eq!(state.live.connection_count("carol"), 1);
    drop(live);
    assert_eq!(state.live.connection_count("carol"), 0);

    assert_eq!(
        state
            .live
            .push_to_user("carol", &shared::LiveMessage::notification("hi")),
        0
    );
}
