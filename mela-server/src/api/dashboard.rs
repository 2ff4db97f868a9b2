//! Reporting endpoints

use axum::{Json, extract::State};
use shared::models::{AdminDashboard, CurrentUser, VendorDashboard};

use crate::state::AppState;

use super::ApiResult;

/// GET /api/vendor/dashboard
pub async fn vendor(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<VendorDashboard> {
    Ok(Json(state.dashboards.vendor(&user).await?))
}

/// GET /api/admin/dashboard
pub async fn admin(State(state): State<AppState>, user: CurrentUser) -> ApiResult<AdminDashboard> {
    Ok(Json(state.dashboards.admin(&user).await?))
}
