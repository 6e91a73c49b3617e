use async_trait::async_trait;

use crate::models::{Document, Folder, PermissionGrant, Role, User};
use crate::permissions::{GrantSpec, PermissionError, PermissionResult, UpsertOutcome};

/// What still lives inside a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderContents {
    pub subfolders: i64,
    pub documents: i64,
}

impl FolderContents {
    pub fn is_empty(&self) -> bool {
        self.subfolders == 0 && self.documents == 0
    }

    /// Refuse to delete a folder that still has children.
    pub fn ensure_empty(&self) -> PermissionResult<()> {
        if self.subfolders > 0 {
            return Err(PermissionError::Conflict(
                "Cannot delete folder with subfolders. Delete subfolders first.".to_string(),
            ));
        }
        if self.documents > 0 {
            return Err(PermissionError::Conflict(
                "Cannot delete folder with documents. Move or delete documents first.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Persistence seam for users, documents, folders and grants.
///
/// Every multi-row write (`upsert_grant` and the `*_cascade` deletes) is a
/// single transaction: readers see either all of it or none of it.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn health_check(&self) -> PermissionResult<()>;

    async fn find_user(&self, user_id: i64) -> PermissionResult<Option<User>>;
    async fn find_document(&self, document_id: i64) -> PermissionResult<Option<Document>>;
    async fn find_folder(&self, folder_id: i64) -> PermissionResult<Option<Folder>>;
    async fn find_grant(&self, grant_id: i64) -> PermissionResult<Option<PermissionGrant>>;

    /// Folder containing the document, if it has one.
    async fn folder_of(&self, document_id: i64) -> PermissionResult<Option<Folder>>;

    /// Documents of a project ordered by upload time, newest first.
    async fn documents_in_project(&self, project_id: i64) -> PermissionResult<Vec<Document>>;
    async fn documents_in_folder(&self, folder_id: i64) -> PermissionResult<Vec<Document>>;

    async fn grants_for_document(&self, document_id: i64) -> PermissionResult<Vec<PermissionGrant>>;
    async fn grants_for_folder(&self, folder_id: i64) -> PermissionResult<Vec<PermissionGrant>>;
    async fn grants_for_user(&self, user_id: i64) -> PermissionResult<Vec<PermissionGrant>>;
    async fn grants_for_role(&self, role: Role) -> PermissionResult<Vec<PermissionGrant>>;

    /// Insert or update the grant for `spec.key`.
    ///
    /// Fails with `NotFound` when the target or the grantee user is missing.
    async fn upsert_grant(&self, spec: &GrantSpec, granted_by: &str)
        -> PermissionResult<UpsertOutcome>;

    /// Returns false when no such grant existed.
    async fn delete_grant(&self, grant_id: i64) -> PermissionResult<bool>;

    async fn folder_contents(&self, folder_id: i64) -> PermissionResult<FolderContents>;

    /// Delete a document and its grants. Returns the number of grants removed.
    async fn delete_document_cascade(&self, document_id: i64) -> PermissionResult<u64>;

    /// Delete an empty folder and its grants. Returns the number of grants removed.
    async fn delete_folder_cascade(&self, folder_id: i64) -> PermissionResult<u64>;

    /// Delete a user and every grant naming them. Returns the number of grants removed.
    async fn delete_user_cascade(&self, user_id: i64) -> PermissionResult<u64>;

    async fn folder_is_empty(&self, folder_id: i64) -> PermissionResult<bool> {
        Ok(self.folder_contents(folder_id).await?.is_empty())
    }

    /// Grants that can decide access to `document`: its own plus its folder's.
    async fn candidate_grants(&self, document: &Document) -> PermissionResult<Vec<PermissionGrant>> {
        let mut grants = self.grants_for_document(document.id).await?;
        if let Some(folder) = self.folder_of(document.id).await? {
            grants.extend(self.grants_for_folder(folder.id).await?);
        }
        Ok(grants)
    }
}
