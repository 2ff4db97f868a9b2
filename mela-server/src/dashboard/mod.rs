//! Dashboard aggregation
//!
//! Reports are folded in memory from flattened order lines; revenue uses
//! the unit price captured on each line, never the live product price.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{
    AdminDashboard, CurrentUser, DailyRevenue, OrderLineRecord, OrderStatus, Role, StatusCount,
    TopProduct, TopVendor, VendorDashboard,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::MarketStore;
use crate::error::ServiceResult;

/// Entries in every top-N list
pub const TOP_N: usize = 5;

fn line_revenue(line: &OrderLineRecord) -> Decimal {
    line.unit_price * Decimal::from(line.quantity)
}

fn is_delivered(line: &&OrderLineRecord) -> bool {
    line.status == OrderStatus::Delivered
}

fn distinct_orders<'a>(
    lines: impl Iterator<Item = &'a OrderLineRecord>,
) -> BTreeMap<i64, OrderStatus> {
    lines.map(|l| (l.order_id, l.status)).collect()
}

/// Order count for every status, zero included
fn orders_by_status(lines: &[OrderLineRecord]) -> Vec<StatusCount> {
    let orders = distinct_orders(lines.iter());
    OrderStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: orders.values().filter(|s| *s == status).count() as i64,
        })
        .collect()
}

fn top_products<'a>(lines: impl Iterator<Item = &'a OrderLineRecord>) -> Vec<TopProduct> {
    let mut sold: HashMap<i64, TopProduct> = HashMap::new();
    for line in lines {
        sold.entry(line.product_id)
            .or_insert_with(|| TopProduct {
                product_id: line.product_id,
                name: line.product_name.clone(),
                quantity_sold: 0,
            })
            .quantity_sold += i64::from(line.quantity);
    }
    let mut ranked: Vec<TopProduct> = sold.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then(a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(TOP_N);
    ranked
}

fn revenue_by_day(lines: &[OrderLineRecord]) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for line in lines.iter().filter(is_delivered) {
        *days.entry(line.order_date).or_default() += line_revenue(line);
    }
    days.into_iter()
        .map(|(date, revenue)| DailyRevenue { date, revenue })
        .collect()
}

fn delivered_revenue(lines: &[OrderLineRecord]) -> Decimal {
    lines.iter().filter(is_delivered).map(line_revenue).sum()
}

/// Vendor report over the vendor's own lines
pub fn vendor_dashboard(lines: &[OrderLineRecord]) -> VendorDashboard {
    VendorDashboard {
        total_orders: distinct_orders(lines.iter()).len() as i64,
        delivered_revenue: delivered_revenue(lines),
        orders_by_status: orders_by_status(lines),
        top_products: top_products(lines.iter()),
        revenue_by_day: revenue_by_day(lines),
    }
}

/// Platform report over all lines. `shop_names` labels the top vendors.
pub fn admin_dashboard(
    lines: &[OrderLineRecord],
    total_vendors: i64,
    shop_names: &HashMap<String, String>,
) -> AdminDashboard {
    let customers: BTreeSet<&str> = lines.iter().map(|l| l.customer_id.as_str()).collect();

    let mut by_vendor: HashMap<&str, Decimal> = HashMap::new();
    for line in lines.iter().filter(is_delivered) {
        *by_vendor.entry(line.vendor_id.as_str()).or_default() += line_revenue(line);
    }
    let mut top_vendors: Vec<TopVendor> = by_vendor
        .into_iter()
        .map(|(vendor_id, revenue)| TopVendor {
            vendor_id: vendor_id.to_string(),
            shop_name: shop_names.get(vendor_id).cloned(),
            revenue,
        })
        .collect();
    top_vendors.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.vendor_id.cmp(&b.vendor_id)));
    top_vendors.truncate(TOP_N);

    AdminDashboard {
        total_orders: distinct_orders(lines.iter()).len() as i64,
        total_vendors,
        total_customers: customers.len() as i64,
        delivered_revenue: delivered_revenue(lines),
        orders_by_status: orders_by_status(lines),
        top_vendors,
        top_products: top_products(lines.iter().filter(is_delivered)),
        revenue_by_day: revenue_by_day(lines),
    }
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn MarketStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn vendor(&self, caller: &CurrentUser) -> ServiceResult<VendorDashboard> {
        caller.require(Role::Vendor)?;
        let lines = self.store.list_order_lines(Some(&caller.id)).await?;
        Ok(vendor_dashboard(&lines))
    }

    pub async fn admin(&self, caller: &CurrentUser) -> ServiceResult<AdminDashboard> {
        caller.require(Role::Admin)?;
        let lines = self.store.list_order_lines(None).await?;
        let total_vendors = self.store.count_vendors().await?;

        let mut report = admin_dashboard(&lines, total_vendors, &HashMap::new());
        for vendor in &mut report.top_vendors {
            vendor.shop_name = self
                .store
                .get_vendor_profile(&vendor.vendor_id)
                .await?
                .map(|p| p.shop_name);
        }
        Ok(report)
    }
}
