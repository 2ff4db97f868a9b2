//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;

/// Cart header, at most one per customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub customer_id: String,
}

/// Cart line joined with its product. Quantity is always >= 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub item_id: i64,
    pub quantity: i32,
    pub product: Product,
}

impl CartLine {
    /// quantity × current product price
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Cart with its lines loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartContents {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartContents {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Add-to-cart payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCart {
    pub product_id: i64,
}

/// Cart view returned to customers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    /// Customer has an order that is still Pending or InProcess
    pub has_active_order: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::ProductStatus;

    fn line(item_id: i64, quantity: i32, price: Decimal) -> CartLine {
        CartLine {
            item_id,
            quantity,
            product: Product {
                id: item_id,
                vendor_id: "v1".into(),
                name: format!("p{item_id}"),
                description: None,
                price,
                image_path: None,
                status: ProductStatus::Approved,
                version: 1,
            },
        }
    }

    #[test]
    fn total_sums_quantity_times_price() {
        let contents = CartContents {
            cart: Cart {
                id: 1,
                customer_id: "c1".into(),
            },
            lines: vec![
                line(1, 2, Decimal::from(5)),
                line(2, 1, Decimal::from(10)),
            ],
        };
        assert_eq!(contents.total(), Decimal::from(20));
        assert!(!contents.is_empty());
    }
}
