//! Permission service: store lookups around the pure permission core.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::error::EntityRef;
use super::filter::filter_visible;
use super::guard::is_privileged;
use super::resolver::has_permission;
use super::upsert::GrantSpec;
use super::{PermissionError, PermissionResult};
use crate::models::{Document, DocumentType, PermissionGrant, PermissionLevel, Role, User};
use crate::services::metrics::{
    record_grant_upsert, record_integrity_anomaly, record_permission_decision,
};
use crate::services::EntityStore;

/// Aggregates over the documents a user can see in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total: usize,
    pub total_size: i64,
    pub by_type: BTreeMap<&'static str, usize>,
}

impl DocumentStats {
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut by_type: BTreeMap<&'static str, usize> =
            DocumentType::ALL.iter().map(|t| (t.as_str(), 0)).collect();
        for document in documents {
            *by_type.entry(document.document_type.as_str()).or_default() += 1;
        }

        Self {
            total: documents.len(),
            total_size: documents.iter().map(|d| d.file_size).sum(),
            by_type,
        }
    }
}

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn EntityStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Load a document for a single-item path. A document with no project
    /// is reported as an integrity error.
    async fn load_document(&self, document_id: i64) -> PermissionResult<Document> {
        let document = self
            .store
            .find_document(document_id)
            .await?
            .ok_or(PermissionError::NotFound(EntityRef::Document(document_id)))?;

        if !document.has_project() {
            warn!(document_id, "Document has no project reference");
            record_integrity_anomaly();
            return Err(PermissionError::DataIntegrity { document_id });
        }
        Ok(document)
    }

    async fn decide(
        &self,
        user: &User,
        document: &Document,
        level: PermissionLevel,
    ) -> PermissionResult<bool> {
        let allowed = if is_privileged(user.role) {
            true
        } else {
            let grants = self.store.candidate_grants(document).await?;
            has_permission(document, user, level, &grants)
        };

        record_permission_decision(level, allowed);
        debug!(
            user_id = user.id,
            document_id = document.id,
            level = %level,
            allowed,
            "Permission decision"
        );
        Ok(allowed)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn check_document_access(
        &self,
        user: &User,
        document_id: i64,
        level: PermissionLevel,
    ) -> PermissionResult<bool> {
        let document = self.load_document(document_id).await?;
        self.decide(user, &document, level).await
    }

    /// Return the document when `user` holds `level` on it, `Forbidden` otherwise.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn authorize_document(
        &self,
        user: &User,
        document_id: i64,
        level: PermissionLevel,
    ) -> PermissionResult<Document> {
        let document = self.load_document(document_id).await?;
        if self.decide(user, &document, level).await? {
            Ok(document)
        } else {
            Err(PermissionError::Forbidden(format!(
                "{} access to document {} denied",
                level, document_id
            )))
        }
    }

    async fn visible(&self, user: &User, documents: Vec<Document>) -> PermissionResult<Vec<Document>> {
        if is_privileged(user.role) {
            return Ok(filter_visible(documents, user, &[], &[]));
        }

        let user_grants = self.store.grants_for_user(user.id).await?;
        let role_grants = self.store.grants_for_role(user.role).await?;
        Ok(filter_visible(documents, user, &user_grants, &role_grants))
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn visible_documents_in_project(
        &self,
        user: &User,
        project_id: i64,
    ) -> PermissionResult<Vec<Document>> {
        let documents = self.store.documents_in_project(project_id).await?;
        self.visible(user, documents).await
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn visible_documents_in_folder(
        &self,
        user: &User,
        folder_id: i64,
    ) -> PermissionResult<Vec<Document>> {
        if self.store.find_folder(folder_id).await?.is_none() {
            return Err(PermissionError::NotFound(EntityRef::Folder(folder_id)));
        }
        let documents = self.store.documents_in_folder(folder_id).await?;
        self.visible(user, documents).await
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn project_document_stats(
        &self,
        user: &User,
        project_id: i64,
    ) -> PermissionResult<DocumentStats> {
        let documents = self.visible_documents_in_project(user, project_id).await?;
        Ok(DocumentStats::from_documents(&documents))
    }

    #[instrument(skip(self))]
    pub async fn upsert_grant(
        &self,
        spec: GrantSpec,
        granted_by: &str,
    ) -> PermissionResult<PermissionGrant> {
        let outcome = self.store.upsert_grant(&spec, granted_by).await?;
        record_grant_upsert(outcome.action());
        info!(
            grant_id = outcome.grant().id,
            level = %spec.level,
            action = outcome.action(),
            "Permission granted"
        );
        Ok(outcome.into_grant())
    }

    pub async fn list_document_grants(
        &self,
        document_id: i64,
    ) -> PermissionResult<Vec<PermissionGrant>> {
        self.store.grants_for_document(document_id).await
    }

    pub async fn list_folder_grants(&self, folder_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        self.store.grants_for_folder(folder_id).await
    }

    pub async fn list_role_grants(&self, role: Role) -> PermissionResult<Vec<PermissionGrant>> {
        self.store.grants_for_role(role).await
    }

    #[instrument(skip(self))]
    pub async fn revoke_grant(&self, grant_id: i64) -> PermissionResult<()> {
        if !self.store.delete_grant(grant_id).await? {
            return Err(PermissionError::NotFound(EntityRef::Grant(grant_id)));
        }
        info!(grant_id, "Permission revoked");
        Ok(())
    }

    /// Delete a document the caller holds DELETE on, together with its grants.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete_document(&self, user: &User, document_id: i64) -> PermissionResult<()> {
        self.authorize_document(user, document_id, PermissionLevel::Delete)
            .await?;
        let removed = self.store.delete_document_cascade(document_id).await?;
        info!(document_id, grants_removed = removed, "Document deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_folder(&self, folder_id: i64) -> PermissionResult<()> {
        let removed = self.store.delete_folder_cascade(folder_id).await?;
        info!(folder_id, grants_removed = removed, "Folder deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> PermissionResult<()> {
        let removed = self.store.delete_user_cascade(user_id).await?;
        info!(user_id, grants_removed = removed, "User deleted");
        Ok(())
    }
}
