//! Batch READ filtering over document collections.
//!
//! Listing endpoints never call the resolver per document. Instead the
//! caller's user and role grants are folded once into two id sets and each
//! document is tested against them. The result is the same READ decision
//! the resolver would make, in a single pass.

use std::collections::HashSet;

use tracing::warn;

use super::guard::is_privileged;
use crate::models::{Document, GrantTarget, PermissionGrant, User};
use crate::services::metrics::{record_documents_filtered, record_integrity_anomaly};

/// Document and folder ids a user can read through grants.
#[derive(Debug, Default, Clone)]
pub struct VisibilityIndex {
    documents: HashSet<i64>,
    folders: HashSet<i64>,
}

impl VisibilityIndex {
    /// Build the index from grants, keeping only those that apply to `user`.
    pub fn build<'a>(user: &User, grants: impl IntoIterator<Item = &'a PermissionGrant>) -> Self {
        let mut index = Self::default();
        for grant in grants.into_iter().filter(|g| g.applies_to(user)) {
            match grant.target {
                GrantTarget::Document(id) => {
                    index.documents.insert(id);
                }
                GrantTarget::Folder(id) => {
                    index.folders.insert(id);
                }
            }
        }
        index
    }

    pub fn allows(&self, document: &Document) -> bool {
        self.documents.contains(&document.id)
            || document
                .folder_id
                .map(|folder_id| self.folders.contains(&folder_id))
                .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.folders.is_empty()
    }
}

/// Keep the documents `user` may read, preserving input order.
///
/// Documents without a project are dropped and logged instead of failing the
/// batch. That holds for privileged users too.
pub fn filter_visible(
    documents: Vec<Document>,
    user: &User,
    user_grants: &[PermissionGrant],
    role_grants: &[PermissionGrant],
) -> Vec<Document> {
    let total = documents.len();
    let documents = drop_orphans(documents);

    let visible: Vec<Document> = if is_privileged(user.role) {
        documents
    } else {
        let index = VisibilityIndex::build(user, user_grants.iter().chain(role_grants));
        documents.into_iter().filter(|d| index.allows(d)).collect()
    };

    record_documents_filtered(total - visible.len());
    visible
}

fn drop_orphans(documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|document| {
            if document.has_project() {
                true
            } else {
                warn!(
                    document_id = document.id,
                    "Skipping document with no project reference"
                );
                record_integrity_anomaly();
                false
            }
        })
        .collect()
}
