//! User model - site staff accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Role;

/// User entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            full_name: full_name.into(),
            role,
        }
    }
}

/// Raw `users` row; the role column is free text until parsed.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            role: row.role.parse()?,
        })
    }
}
