//! Dashboard DTOs
//!
//! Revenue always uses the unit price captured on the order line.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderStatus;

/// Flattened order line used as aggregation input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineRecord {
    pub order_id: i64,
    pub customer_id: String,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub product_id: i64,
    pub product_name: String,
    pub vendor_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub quantity_sold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopVendor {
    pub vendor_id: String,
    pub shop_name: Option<String>,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorDashboard {
    pub total_orders: i64,
    pub delivered_revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub top_products: Vec<TopProduct>,
    pub revenue_by_day: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminDashboard {
    pub total_orders: i64,
    pub total_vendors: i64,
    pub total_customers: i64,
    pub delivered_revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub top_vendors: Vec<TopVendor>,
    pub top_products: Vec<TopProduct>,
    pub revenue_by_day: Vec<DailyRevenue>,
}
