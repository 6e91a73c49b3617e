//! Fixture builders for permission unit tests.

use chrono::Utc;

use crate::models::{Document, GrantTarget, Grantee, PermissionGrant, PermissionLevel, Role, User};

pub fn user(id: i64, role: Role) -> User {
    User::new(id, format!("user{}", id), format!("User {}", id), role)
}

/// Document in project 1, optionally inside a folder.
pub fn doc(id: i64, folder_id: Option<i64>) -> Document {
    Document::new(id, 1, folder_id, format!("doc-{}.pdf", id), "admin")
}

pub fn grant(id: i64, level: PermissionLevel, target: GrantTarget, grantee: Grantee) -> PermissionGrant {
    PermissionGrant {
        id,
        level,
        target,
        grantee,
        granted_by: "admin".to_string(),
        granted_at: Utc::now(),
    }
}
