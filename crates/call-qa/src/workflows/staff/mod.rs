//! Staff accounts: roles, employment records, and dated status periods.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod record;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use record::{
    EmploymentStatus, NewStaff, StaffError, StaffRecord, StatusChange, StatusPeriod, RATES,
};
pub use repository::{RepositoryError, StaffRepository};
pub use router::staff_router;
pub use service::{StaffService, StaffServiceError};

/// Identifier of an admin, supervisor, or operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub u64);

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account role; the wire names match the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "sv")]
    Supervisor,
    #[serde(rename = "operator")]
    Operator,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Supervisor => "sv",
            StaffRole::Operator => "operator",
        }
    }

    /// Admins and supervisors manage evaluations and hand out tasks.
    pub const fn is_manager(self) -> bool {
        matches!(self, StaffRole::Admin | StaffRole::Supervisor)
    }
}

/// The account performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: StaffId,
    pub role: StaffRole,
}

impl Actor {
    pub const fn new(user_id: StaffId, role: StaffRole) -> Self {
        Self { user_id, role }
    }
}
