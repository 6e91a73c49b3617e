//! Role guards shared by every access path.
//!
//! `is_privileged` is the only place that knows which roles bypass grant
//! resolution. The single-document check, the batch filter and the
//! management endpoints all go through it.

use crate::models::{Role, User};

use super::PermissionError;

/// ADMIN and DOCTOR see and do everything without consulting grants.
pub fn is_privileged(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Doctor)
}

pub fn is_administrator(role: Role) -> bool {
    role == Role::Admin
}

/// Reject callers that are not allowed to manage documents, folders or grants.
pub fn require_privileged(user: &User) -> Result<(), PermissionError> {
    if is_privileged(user.role) {
        Ok(())
    } else {
        Err(PermissionError::Forbidden(format!(
            "role {} cannot manage permissions",
            user.role
        )))
    }
}

pub fn require_administrator(user: &User) -> Result<(), PermissionError> {
    if is_administrator(user.role) {
        Ok(())
    } else {
        Err(PermissionError::Forbidden(format!(
            "role {} cannot manage users",
            user.role
        )))
    }
}
