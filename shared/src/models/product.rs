//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Approval state set by administrators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "product_status"))]
pub enum ProductStatus {
    Pending,
    Approved,
    Rejected,
}

/// Product entity, owned by exactly one vendor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Vendor user id
    pub vendor_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_path: Option<String>,
    pub status: ProductStatus,
    /// Optimistic concurrency token, bumped on every update
    pub version: i64,
}

impl Product {
    pub fn is_approved(&self) -> bool {
        self.status == ProductStatus::Approved
    }
}

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() && price.scale() <= 2 {
        Ok(())
    } else {
        Err(ValidationError::new("price")
            .with_message("price must be > 0 with at most 2 decimals".into()))
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom(function = "positive_price"))]
    pub price: Decimal,
    #[validate(length(max = 500))]
    pub image_path: Option<String>,
}

/// Update product payload
///
/// `version` must match the stored product, otherwise the update is
/// rejected as a concurrent modification.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom(function = "positive_price"))]
    pub price: Decimal,
    #[validate(length(max = 500))]
    pub image_path: Option<String>,
    pub version: i64,
}

/// Product listing filter
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub vendor_id: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductFilter {
    pub fn approved() -> Self {
        Self {
            vendor_id: None,
            status: Some(ProductStatus::Approved),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.vendor_id
            .as_deref()
            .is_none_or(|v| v == product.vendor_id)
            && self.status.is_none_or(|s| s == product.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, price: Decimal) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            description: None,
            price,
            image_path: None,
        }
    }

    #[test]
    fn create_payload_validation() {
        assert!(create("Injera", Decimal::new(550, 2)).validate().is_ok());
        assert!(create("", Decimal::from(5)).validate().is_err());
        assert!(create(&"x".repeat(151), Decimal::from(5)).validate().is_err());
        assert!(create("Tibs", Decimal::from(0)).validate().is_err());
        assert!(create("Tibs", Decimal::from(-1)).validate().is_err());
        assert!(create("Tibs", Decimal::new(1999, 3)).validate().is_err());
    }

    #[test]
    fn filter_matches_vendor_and_status() {
        let product = Product {
            id: 1,
            vendor_id: "v1".into(),
            name: "Shiro".into(),
            description: None,
            price: Decimal::from(4),
            image_path: None,
            status: ProductStatus::Approved,
            version: 1,
        };
        assert!(ProductFilter::default().matches(&product));
        assert!(ProductFilter::approved().matches(&product));
        let other_vendor = ProductFilter {
            vendor_id: Some("v2".into()),
            status: None,
        };
        assert!(!other_vendor.matches(&product));
        let pending = ProductFilter {
            vendor_id: None,
            status: Some(ProductStatus::Pending),
        };
        assert!(!pending.matches(&product));
    }
}
