//! Customer and vendor profiles

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::order::ContactSnapshot;

/// Customer profile, keyed by user id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CustomerProfile {
    pub user_id: String,
    pub full_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
}

impl CustomerProfile {
    /// Contact details to copy into a new order. The order keeps the
    /// street address only; `city` stays on the profile.
    pub fn contact(&self) -> ContactSnapshot {
        ContactSnapshot {
            name: self.full_name.clone(),
            address: self.address.clone(),
            phone: self.phone_number.clone(),
        }
    }
}

/// Customer profile upsert payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerProfileUpsert {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 30))]
    pub phone_number: Option<String>,
}

/// Vendor profile, keyed by user id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VendorProfile {
    pub user_id: String,
    pub shop_name: String,
    pub shop_address: Option<String>,
    pub contact_number: Option<String>,
    pub description: Option<String>,
    pub logo_path: Option<String>,
}

/// Vendor profile upsert payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VendorProfileUpsert {
    #[validate(length(min = 1, max = 100))]
    pub shop_name: String,
    #[validate(length(max = 200))]
    pub shop_address: Option<String>,
    #[validate(length(max = 30))]
    pub contact_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub logo_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_copies_street_address_only() {
        let profile = CustomerProfile {
            user_id: "c1".into(),
            full_name: "Abebe Kebede".into(),
            address: Some("Bole Road 12".into()),
            city: Some("Addis Ababa".into()),
            phone_number: Some("+251911000000".into()),
        };
        let contact = profile.contact();
        assert_eq!(contact.name, "Abebe Kebede");
        assert_eq!(contact.address.as_deref(), Some("Bole Road 12"));
        assert_eq!(contact.phone.as_deref(), Some("+251911000000"));

        let no_street = CustomerProfile {
            address: None,
            ..profile
        };
        assert_eq!(no_street.contact().address, None);
    }

    #[test]
    fn upsert_requires_full_name() {
        let upsert = CustomerProfileUpsert {
            full_name: String::new(),
            address: None,
            city: None,
            phone_number: None,
        };
        let errors = upsert.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("full_name"));

        let too_long = CustomerProfileUpsert {
            full_name: "x".repeat(101),
            address: None,
            city: None,
            phone_number: None,
        };
        assert!(too_long.validate().is_err());
    }
}
