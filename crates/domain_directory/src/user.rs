//! User entity and role model
//!
//! Users are the people operating the platform: owners who see everything,
//! managers who run a team of medical representatives, and the MRs who make
//! field visits. A Manager's team is the set of MRs whose `manager_id` points
//! at them; that relationship is what every scoped query resolves against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::UserId;

/// Platform role determining data visibility and allowed operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Unrestricted access across the organisation
    Owner,
    /// Sees and manages the MRs reporting to them
    Manager,
    /// Medical representative; sees only their own data
    Mr,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Mr => "MR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "MANAGER" => Ok(Role::Manager),
            "MR" => Ok(Role::Mr),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A platform user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Primary email address
    pub email: Option<String>,
    /// Primary phone number
    pub phone: Option<String>,
    /// Platform role
    pub role: Role,
    /// The manager this user reports to (MRs only)
    pub manager_id: Option<UserId>,
    /// Whether this user is active
    pub is_active: bool,
    /// When this user was created
    pub created_at: DateTime<Utc>,
    /// When this user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active user with the given role
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new_v7(),
            name: name.into(),
            email: None,
            phone: None,
            role,
            manager_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new MR reporting to the given manager
    pub fn new_mr(name: impl Into<String>, manager_id: UserId) -> Self {
        let mut user = Self::new(name, Role::Mr);
        user.manager_id = Some(manager_id);
        user
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_mr(&self) -> bool {
        self.role == Role::Mr
    }

    /// True if this user is an MR reporting to `manager_id`
    pub fn reports_to(&self, manager_id: UserId) -> bool {
        self.is_mr() && self.manager_id == Some(manager_id)
    }
}
