//! HTTP API

pub mod cart;
pub mod dashboard;
pub mod health;
pub mod live;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod profile;

use axum::Router;
use axum::routing::{delete, get, post, put};
use shared::error::AppError;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Max in-flight requests
const CONCURRENCY_LIMIT: usize = 512;

/// Validate a request body, reporting failing fields in `details.field_errors`
pub fn validate<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut fields: Vec<serde_json::Value> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
                serde_json::json!({ "field": field.to_string(), "codes": codes })
            })
            .collect();
        fields.sort_by(|a, b| a["field"].as_str().cmp(&b["field"].as_str()));
        AppError::validation("Validation failed").with_detail("field_errors", fields)
    })
}

async fn route_not_found(uri: axum::http::Uri) -> AppError {
    AppError::not_found(format!("Route {}", uri.path()))
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/products", get(products::list_approved))
        .route("/api/products/{id}", get(products::get_approved))
        .route(
            "/api/vendors/{vendor_id}/products",
            get(products::list_by_vendor),
        );

    let customer = Router::new()
        .route("/api/cart", get(cart::view))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{id}/decrement",
            post(cart::decrement_item),
        )
        .route("/api/cart/items/{id}", delete(cart::remove_item))
        .route("/api/orders/checkout", get(orders::checkout_preview))
        .route(
            "/api/orders",
            get(orders::list_mine).post(orders::create_order),
        )
        .route("/api/orders/{id}", get(orders::get_mine))
        .route(
            "/api/customer/profile",
            get(profile::get_customer).put(profile::put_customer),
        );

    let vendor = Router::new()
        .route("/api/vendor/orders", get(orders::list_vendor))
        .route("/api/vendor/orders/{id}/accept", post(orders::accept))
        .route("/api/vendor/orders/{id}/deliver", post(orders::deliver))
        .route(
            "/api/vendor/products",
            get(products::list_own).post(products::create),
        )
        .route(
            "/api/vendor/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/api/vendor/dashboard", get(dashboard::vendor))
        .route(
            "/api/vendor/profile",
            get(profile::get_vendor).put(profile::put_vendor),
        );

    let admin = Router::new()
        .route("/api/admin/products", get(products::list_all))
        .route("/api/admin/products/{id}/approve", post(products::approve))
        .route("/api/admin/products/{id}/reject", post(products::reject))
        .route("/api/admin/dashboard", get(dashboard::admin))
        .route("/api/admin/broadcast", post(live::broadcast));

    let shared_routes = Router::new()
        .route("/api/notifications", get(notifications::list_recent))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        .route("/api/live/ws", get(live::handle_live_ws));

    Router::new()
        .merge(public)
        .merge(customer)
        .merge(vendor)
        .merge(admin)
        .merge(shared_routes)
        .fallback(route_not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(CONCURRENCY_LIMIT))
        .with_state(state)
}
