//! Notification polling endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{CurrentUser, Notification, RecentQuery};

use crate::state::AppState;

use super::ApiResult;

/// GET /api/notifications?limit=
pub async fn list_recent(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<Notification>> {
    Ok(Json(
        state.notifications.list_recent(&user, query.limit).await?,
    ))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Notification> {
    Ok(Json(state.notifications.mark_read(&user, id).await?))
}
