//! Grant identity and insert-or-update semantics.
//!
//! A grant is identified by `(target, grantee)`. Writing a grant for a key
//! that already exists only replaces its level; the row id, `granted_by` and
//! `granted_at` of the first write are kept.

use chrono::Utc;

use super::{PermissionError, PermissionResult};
use crate::models::{GrantKey, GrantTarget, Grantee, PermissionGrant, PermissionLevel, Role};

/// Validated request to set the level for one grant key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantSpec {
    pub key: GrantKey,
    pub level: PermissionLevel,
}

impl GrantSpec {
    pub fn new(target: GrantTarget, grantee: Grantee, level: PermissionLevel) -> Self {
        Self {
            key: GrantKey { target, grantee },
            level,
        }
    }

    /// Build from the loose fields of an API request.
    ///
    /// Exactly one of `document_id`/`folder_id` and exactly one of
    /// `user_id`/`role` must be set. The resulting key is one of, in lookup
    /// order: (document, user), (document, role), (folder, user),
    /// (folder, role).
    pub fn from_parts(
        document_id: Option<i64>,
        folder_id: Option<i64>,
        user_id: Option<i64>,
        role: Option<Role>,
        level: PermissionLevel,
    ) -> PermissionResult<Self> {
        let target = match (document_id, folder_id) {
            (Some(id), None) => GrantTarget::Document(id),
            (None, Some(id)) => GrantTarget::Folder(id),
            (Some(_), Some(_)) => {
                return Err(PermissionError::InvalidGrantSpec(
                    "grant must target a document or a folder, not both",
                ))
            }
            (None, None) => {
                return Err(PermissionError::InvalidGrantSpec(
                    "grant must target a document or a folder",
                ))
            }
        };

        let grantee = match (user_id, role) {
            (Some(id), None) => Grantee::User(id),
            (None, Some(role)) => Grantee::Role(role),
            (Some(_), Some(_)) => {
                return Err(PermissionError::InvalidGrantSpec(
                    "grant must name a user or a role, not both",
                ))
            }
            (None, None) => {
                return Err(PermissionError::InvalidGrantSpec(
                    "grant must name a user or a role",
                ))
            }
        };

        Ok(Self::new(target, grantee, level))
    }

    pub fn target(&self) -> GrantTarget {
        self.key.target
    }

    pub fn grantee(&self) -> Grantee {
        self.key.grantee
    }
}

/// Result of an upsert, carrying the stored grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(PermissionGrant),
    Updated(PermissionGrant),
}

impl UpsertOutcome {
    pub fn grant(&self) -> &PermissionGrant {
        match self {
            UpsertOutcome::Inserted(grant) | UpsertOutcome::Updated(grant) => grant,
        }
    }

    pub fn into_grant(self) -> PermissionGrant {
        match self {
            UpsertOutcome::Inserted(grant) | UpsertOutcome::Updated(grant) => grant,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted(_) => "inserted",
            UpsertOutcome::Updated(_) => "updated",
        }
    }
}

/// Apply an upsert to an in-memory grant list.
///
/// `next_id` is only called when a new grant is inserted.
pub fn apply_upsert(
    grants: &mut Vec<PermissionGrant>,
    spec: &GrantSpec,
    granted_by: &str,
    next_id: impl FnOnce() -> i64,
) -> UpsertOutcome {
    if let Some(existing) = grants.iter_mut().find(|g| g.key() == spec.key) {
        existing.level = spec.level;
        return UpsertOutcome::Updated(existing.clone());
    }

    let grant = PermissionGrant {
        id: next_id(),
        level: spec.level,
        target: spec.target(),
        grantee: spec.grantee(),
        granted_by: granted_by.to_string(),
        granted_at: Utc::now(),
    };
    grants.push(grant.clone());
    UpsertOutcome::Inserted(grant)
}
