//! Role model - the fixed set of user roles.

use serde::{Deserialize, Serialize};

/// User roles. Every user carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Doctor,
    User,
    Auditor,
    Coordinator,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Doctor,
        Role::User,
        Role::Auditor,
        Role::Coordinator,
    ];

    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::User => "USER",
            Role::Auditor => "AUDITOR",
            Role::Coordinator => "COORDINATOR",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "USER" => Ok(Role::User),
            "AUDITOR" => Ok(Role::Auditor),
            "COORDINATOR" => Ok(Role::Coordinator),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}
