//! Roles and permissions.
//!
//! The set of role names is closed ([`RoleName`]); the role records
//! themselves (ids, descriptions) and the permission catalogue are data
//! owned by the role store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::AppError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Employee,
    /// Assigned when registration does not name a role.
    #[default]
    Waiter,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::Employee, RoleName::Waiter];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Employee => "employee",
            RoleName::Waiter => "waiter",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, RoleName::Admin)
    }

    pub fn is_employee(&self) -> bool {
        matches!(self, RoleName::Employee)
    }

    pub fn is_waiter(&self) -> bool {
        matches!(self, RoleName::Waiter)
    }

    pub(crate) fn default_description(&self) -> &'static str {
        match self {
            RoleName::Admin => "Restaurant administrator with full access",
            RoleName::Employee => "Staff employee (kitchen, inventory, back office)",
            RoleName::Waiter => "Waiter serving tables and taking orders",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(RoleName::Admin),
            "employee" => Ok(RoleName::Employee),
            "waiter" => Ok(RoleName::Waiter),
            _ => Err(AppError::Validation(format!(
                "Role must be one of: {}",
                RoleName::ALL.map(|r| r.as_str()).join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: RoleName,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Builds a role from stored fields. The name is normalised and must be
    /// one of the permitted roles.
    pub fn from_parts(
        id: String,
        name: &str,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if id.is_empty() {
            return Err(AppError::Validation("Role id is required".to_string()));
        }
        Ok(Self {
            id,
            name: name.parse()?,
            description,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
