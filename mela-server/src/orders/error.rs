//! Order engine errors

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, OrderTransition};
use thiserror::Error;

use crate::db::StoreError;
use crate::error::ServiceError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order {0} contains none of the caller's products")]
    NotOrderVendor(i64),

    #[error("Order {order_id} cannot {transition:?} while {current}")]
    InvalidTransition {
        order_id: i64,
        transition: OrderTransition,
        current: OrderStatus,
    },

    #[error("Order {0} was modified concurrently")]
    Conflict(i64),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => ServiceError::App(
                AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id),
            ),
            OrderError::NotOrderVendor(id) => ServiceError::App(
                AppError::new(ErrorCode::NotOrderVendor).with_detail("order_id", id),
            ),
            OrderError::InvalidTransition {
                order_id, current, ..
            } => ServiceError::App(
                AppError::invalid_transition(current.as_str()).with_detail("order_id", order_id),
            ),
            OrderError::Conflict(id) => ServiceError::App(
                AppError::conflict(format!("Order {id} was modified concurrently"))
                    .with_detail("order_id", id),
            ),
            OrderError::App(e) => ServiceError::App(e),
            OrderError::Storage(e) => e.into(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        ServiceError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_error_codes() {
        let cases = [
            (OrderError::OrderNotFound(1), ErrorCode::OrderNotFound),
            (OrderError::NotOrderVendor(1), ErrorCode::NotOrderVendor),
            (
                OrderError::InvalidTransition {
                    order_id: 1,
                    transition: OrderTransition::Deliver,
                    current: OrderStatus::Pending,
                },
                ErrorCode::InvalidTransition,
            ),
            (OrderError::Conflict(1), ErrorCode::ConcurrencyConflict),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code, code);
        }
    }

    #[test]
    fn invalid_transition_reports_current_status() {
        let err = AppError::from(OrderError::InvalidTransition {
            order_id: 7,
            transition: OrderTransition::Accept,
            current: OrderStatus::Delivered,
        });
        let details = err.details.unwrap();
        assert_eq!(details["current_status"], "Delivered");
        assert_eq!(details["order_id"], 7);
    }
}
