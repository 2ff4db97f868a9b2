//! Customer cart endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shared::error::ApiResponse;
use shared::models::{AddToCart, CartView, CurrentUser};

use crate::state::AppState;

use super::ApiResult;

/// Quantity left on a cart line after an edit (`None` once removed)
#[derive(Debug, Serialize)]
pub struct LineQuantity {
    pub quantity: Option<i32>,
}

/// GET /api/cart
pub async fn view(State(state): State<AppState>, user: CurrentUser) -> ApiResult<CartView> {
    Ok(Json(state.carts.view(&user).await?))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddToCart>,
) -> ApiResult<LineQuantity> {
    let quantity = state.carts.add(&user, req.product_id).await?;
    Ok(Json(LineQuantity {
        quantity: Some(quantity),
    }))
}

/// POST /api/cart/items/{id}/decrement
pub async fn decrement_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<i64>,
) -> ApiResult<LineQuantity> {
    let quantity = state.carts.remove_one(&user, item_id).await?;
    Ok(Json(LineQuantity { quantity }))
}

/// DELETE /api/cart/items/{id}
pub async fn remove_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    state.carts.remove_all(&user, item_id).await?;
    Ok(Json(ApiResponse::ok()))
}
