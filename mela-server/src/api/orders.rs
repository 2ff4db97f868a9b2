//! Checkout and order lifecycle endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{CheckoutOutcome, CheckoutPreview, CurrentUser, Order};

use crate::state::AppState;

use super::ApiResult;

/// GET /api/orders/checkout
pub async fn checkout_preview(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<CheckoutPreview> {
    Ok(Json(state.orders.checkout_preview(&user).await?))
}

/// POST /api/orders
///
/// An empty cart answers 200 with `{"outcome":"empty_cart"}`.
pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<CheckoutOutcome> {
    Ok(Json(state.orders.create_order(&user).await?))
}

/// GET /api/orders
pub async fn list_mine(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Order>> {
    Ok(Json(state.orders.customer_orders(&user).await?))
}

/// GET /api/orders/{id}
pub async fn get_mine(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    Ok(Json(state.orders.customer_order(&user, id).await?))
}

/// GET /api/vendor/orders
pub async fn list_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Order>> {
    Ok(Json(state.orders.vendor_orders(&user).await?))
}

/// POST /api/vendor/orders/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    Ok(Json(state.orders.accept(&user, id).await?))
}

/// POST /api/vendor/orders/{id}/deliver
pub async fn deliver(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    Ok(Json(state.orders.deliver(&user, id).await?))
}
