//! Service-layer error type
//!
//! `ServiceError` bridges store errors (`StoreError`, `sqlx::Error`) and the
//! API error (`AppError`), so handlers and services can use `?` without
//! repeating `map_err` + logging at every call site.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::{Resource, StoreError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// - `Db`: infrastructure failure (logged once, surfaced as `InternalError`)
/// - `App`: business-rule failure (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

fn not_found_code(resource: Resource) -> ErrorCode {
    match resource {
        Resource::Product => ErrorCode::ProductNotFound,
        Resource::Order => ErrorCode::OrderNotFound,
        Resource::CartItem => ErrorCode::CartItemNotFound,
        Resource::Notification => ErrorCode::NotificationNotFound,
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(resource) => ServiceError::App(AppError::with_message(
                not_found_code(resource),
                format!("{resource} not found"),
            )),
            StoreError::Conflict(msg) => ServiceError::App(AppError::conflict(msg)),
            StoreError::InUse(what) => ServiceError::App(AppError::with_message(
                ErrorCode::ProductInUse,
                format!("{what} is referenced by existing orders"),
            )),
            StoreError::Database(e) => ServiceError::Db(e.into()),
            StoreError::Internal(msg) => ServiceError::Db(msg.into()),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_resource_code() {
        let err: AppError = ServiceError::from(StoreError::NotFound(Resource::Order)).into();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.message, "Order not found");

        let err: AppError = ServiceError::from(StoreError::NotFound(Resource::CartItem)).into();
        assert_eq!(err.code, ErrorCode::CartItemNotFound);
        assert_eq!(err.message, "Cart item not found");
    }

    #[test]
    fn store_conflict_and_in_use() {
        let err: AppError = ServiceError::from(StoreError::Conflict("stale".into())).into();
        assert_eq!(err.code, ErrorCode::ConcurrencyConflict);

        let err: AppError = ServiceError::from(StoreError::InUse("Product 3".into())).into();
        assert_eq!(err.code, ErrorCode::ProductInUse);
    }

    #[test]
    fn infrastructure_errors_are_hidden() {
        let err: AppError = ServiceError::from(StoreError::Internal("boom".into())).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!err.message.contains("boom"));
    }
}
