//! Customer and vendor profile endpoints

use axum::{Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CurrentUser, CustomerProfile, CustomerProfileUpsert, Role, VendorProfile, VendorProfileUpsert,
};

use crate::error::ServiceError;
use crate::state::AppState;

use super::{ApiResult, validate};

/// GET /api/customer/profile
pub async fn get_customer(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<CustomerProfile> {
    user.require(Role::Customer)?;
    state
        .store
        .get_customer_profile(&user.id)
        .await
        .map_err(ServiceError::from)?
        .map(Json)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))
}

/// PUT /api/customer/profile
pub async fn put_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<CustomerProfileUpsert>,
) -> ApiResult<CustomerProfile> {
    user.require(Role::Customer)?;
    validate(&data)?;
    let profile = CustomerProfile {
        user_id: user.id,
        full_name: data.full_name,
        address: data.address,
        city: data.city,
        phone_number: data.phone_number,
    };
    let saved = state
        .store
        .upsert_customer_profile(profile)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(saved))
}

/// GET /api/vendor/profile
pub async fn get_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<VendorProfile> {
    user.require(Role::Vendor)?;
    state
        .store
        .get_vendor_profile(&user.id)
        .await
        .map_err(ServiceError::from)?
        .map(Json)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))
}

/// PUT /api/vendor/profile
pub async fn put_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(data): Json<VendorProfileUpsert>,
) -> ApiResult<VendorProfile> {
    user.require(Role::Vendor)?;
    validate(&data)?;
    let profile = VendorProfile {
        user_id: user.id,
        shop_name: data.shop_name,
        shop_address: data.shop_address,
        contact_number: data.contact_number,
        description: data.description,
        logo_path: data.logo_path,
    };
    let saved = state
        .store
        .upsert_vendor_profile(profile)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(saved))
}
