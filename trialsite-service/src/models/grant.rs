//! Permission grant model - document/folder access for a user or a role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Role, User};

/// Stored permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    Read,
    Write,
    Delete,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Read => "READ",
            PermissionLevel::Write => "WRITE",
            PermissionLevel::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ" => Ok(PermissionLevel::Read),
            "WRITE" => Ok(PermissionLevel::Write),
            "DELETE" => Ok(PermissionLevel::Delete),
            _ => Err(format!("Invalid permission level: {}", s)),
        }
    }
}

/// What a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum GrantTarget {
    Document(i64),
    Folder(i64),
}

impl GrantTarget {
    pub fn document_id(&self) -> Option<i64> {
        match self {
            GrantTarget::Document(id) => Some(*id),
            GrantTarget::Folder(_) => None,
        }
    }

    pub fn folder_id(&self) -> Option<i64> {
        match self {
            GrantTarget::Folder(id) => Some(*id),
            GrantTarget::Document(_) => None,
        }
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Grantee {
    User(i64),
    Role(Role),
}

impl Grantee {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Grantee::User(id) => Some(*id),
            Grantee::Role(_) => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Grantee::Role(role) => Some(*role),
            Grantee::User(_) => None,
        }
    }

    /// A user matches a grantee by id or by role; either one is enough.
    pub fn matches(&self, user: &User) -> bool {
        match self {
            Grantee::User(id) => *id == user.id,
            Grantee::Role(role) => *role == user.role,
        }
    }
}

/// Identity of a grant. The level is deliberately not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    pub target: GrantTarget,
    pub grantee: Grantee,
}

/// Permission grant entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: i64,
    pub level: PermissionLevel,
    pub target: GrantTarget,
    pub grantee: Grantee,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
}

impl PermissionGrant {
    pub fn key(&self) -> GrantKey {
        GrantKey {
            target: self.target,
            grantee: self.grantee,
        }
    }

    pub fn applies_to(&self, user: &User) -> bool {
        self.grantee.matches(user)
    }
}

/// Raw `document_permissions` row with nullable target/grantee columns.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionGrantRow {
    pub id: i64,
    pub permission_type: String,
    pub document_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub user_id: Option<i64>,
    pub role_name: Option<String>,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
}

impl TryFrom<PermissionGrantRow> for PermissionGrant {
    type Error = String;

    fn try_from(row: PermissionGrantRow) -> Result<Self, Self::Error> {
        let target = match (row.document_id, row.folder_id) {
            (Some(document_id), None) => GrantTarget::Document(document_id),
            (None, Some(folder_id)) => GrantTarget::Folder(folder_id),
            _ => {
                return Err(format!(
                    "Grant {} must target exactly one of document or folder",
                    row.id
                ))
            }
        };

        let grantee = match (row.user_id, row.role_name) {
            (Some(user_id), None) => Grantee::User(user_id),
            (None, Some(role)) => Grantee::Role(role.parse()?),
            _ => {
                return Err(format!(
                    "Grant {} must name exactly one of user or role",
                    row.id
                ))
            }
        };

        Ok(Self {
            id: row.id,
            level: row.permission_type.parse()?,
            target,
            grantee,
            granted_by: row.granted_by,
            granted_at: row.granted_at,
        })
    }
}
