//! Caller identity
//!
//! Identities come from an external provider; the server only sees the
//! verified token claims, mapped into [`CurrentUser`].

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::live::LiveGroup;

/// Marketplace role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Vendor,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Vendor => "Vendor",
            Self::Customer => "Customer",
        }
    }

    /// Live-push group joined by callers holding this role
    pub fn group(&self) -> LiveGroup {
        match self {
            Self::Admin => LiveGroup::Admins,
            Self::Vendor => LiveGroup::Vendors,
            Self::Customer => LiveGroup::Customers,
        }
    }
}

/// Authenticated caller, passed explicitly into every operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Capability check: fail with `RoleRequired` unless the caller holds `role`
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::role_required(role.as_str()))
        }
    }

    /// Single live group for this caller: Admin, then Vendor, then Customer
    pub fn primary_group(&self) -> Option<LiveGroup> {
        [Role::Admin, Role::Vendor, Role::Customer]
            .into_iter()
            .find(|r| self.has_role(*r))
            .map(|r| r.group())
    }
}
