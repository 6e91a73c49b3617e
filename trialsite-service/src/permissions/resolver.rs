//! Single-document permission resolution.
//!
//! The resolver is a pure function over grants that were already loaded for
//! a document and, when it sits in a folder, for that folder. It never
//! applies the privileged-role bypass; callers do that through
//! [`super::guard::is_privileged`] before they get here.

use crate::models::{Document, GrantTarget, PermissionGrant, PermissionLevel, User};

/// Does a grant of level `granted` allow an operation needing `required`?
///
/// READ is implied by every level. DELETE needs a DELETE grant. WRITE grants
/// do not imply DELETE.
pub fn level_allows(granted: PermissionLevel, required: PermissionLevel) -> bool {
    match required {
        PermissionLevel::Read => true,
        PermissionLevel::Write => {
            matches!(granted, PermissionLevel::Write | PermissionLevel::Delete)
        }
        PermissionLevel::Delete => granted == PermissionLevel::Delete,
    }
}

/// Whether a grant targets this document directly or through its folder.
pub fn covers_document(grant: &PermissionGrant, document: &Document) -> bool {
    match grant.target {
        GrantTarget::Document(id) => id == document.id,
        GrantTarget::Folder(id) => document.folder_id == Some(id),
    }
}

/// Decide whether `user` may perform `required` on `document`.
///
/// Document grants and folder grants are unioned; user grants and role grants
/// carry equal weight. The answer is whether any matching grant satisfies the
/// level, so there is no ordering between grants. No grants means deny.
pub fn has_permission(
    document: &Document,
    user: &User,
    required: PermissionLevel,
    grants: &[PermissionGrant],
) -> bool {
    grants
        .iter()
        .filter(|grant| covers_document(grant, document))
        .filter(|grant| grant.applies_to(user))
        .any(|grant| level_allows(grant.level, required))
}
