//! Product catalog: public browsing, vendor catalog, admin moderation

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{
    CurrentUser, Product, ProductCreate, ProductFilter, ProductStatus, ProductUpdate, Role,
};

use crate::error::ServiceError;
use crate::state::AppState;

use super::{ApiResult, validate};

// ========== Public ==========

/// GET /api/products
pub async fn list_approved(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = state
        .store
        .list_products(&ProductFilter::approved())
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn get_approved(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Product> {
    state
        .store
        .get_product(id)
        .await
        .map_err(ServiceError::from)?
        .filter(Product::is_approved)
        .map(Json)
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))
}

/// GET /api/vendors/{vendor_id}/products
pub async fn list_by_vendor(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> ApiResult<Vec<Product>> {
    let filter = ProductFilter {
        vendor_id: Some(vendor_id),
        status: Some(ProductStatus::Approved),
    };
    let products = state
        .store
        .list_products(&filter)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(products))
}

// ========== Vendor ==========

/// GET /api/vendor/products
pub async fn list_own(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Product>> {
    user.require(Role::Vendor)?;
    let filter = ProductFilter {
        vendor_id: Some(user.id),
        status: None,
    };
    let products = state
        .store
        .list_products(&filter)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(products))
}

/// POST /api/vendor/products
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<ProductCreate>,
) -> ApiResult<Product> {
    user.require(Role::Vendor)?;
    validate(&data)?;
    let product = state
        .store
        .insert_product(&user.id, &data)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(product_id = product.id, vendor_id = %user.id, "Product created");
    Ok(Json(product))
}

/// PUT /api/vendor/products/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<ProductUpdate>,
) -> ApiResult<Product> {
    user.require(Role::Vendor)?;
    validate(&data)?;
    let product = state
        .store
        .update_product(id, &user.id, &data)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(product))
}

/// DELETE /api/vendor/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    user.require(Role::Vendor)?;
    state
        .store
        .delete_product(id, &user.id)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(product_id = id, vendor_id = %user.id, "Product deleted");
    Ok(Json(ApiResponse::ok()))
}

// ========== Admin ==========

/// GET /api/admin/products
pub async fn list_all(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Product>> {
    user.require(Role::Admin)?;
    let products = state
        .store
        .list_products(&ProductFilter::default())
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(products))
}

async fn set_status(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    status: ProductStatus,
) -> ApiResult<Product> {
    user.require(Role::Admin)?;
    let product = state
        .store
        .set_product_status(id, status)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(product_id = id, admin_id = %user.id, status = ?status, "Product moderated");
    Ok(Json(product))
}

/// POST /api/admin/products/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Product> {
    set_status(&state, &user, id, ProductStatus::Approved).await
}

/// POST /api/admin/products/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Product> {
    set_status(&state, &user, id, ProductStatus::Rejected).await
}
