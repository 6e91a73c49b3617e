//! In-memory entity store for tests and local development.
//!
//! All tables sit behind one `RwLock`, so every write (including cascades)
//! is a single critical section.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};

use super::store::{EntityStore, FolderContents};
use crate::models::{Document, Folder, GrantTarget, Grantee, PermissionGrant, Role, User};
use crate::permissions::error::EntityRef;
use crate::permissions::upsert::apply_upsert;
use crate::permissions::{GrantSpec, PermissionError, PermissionResult, UpsertOutcome};
use service_core::error::AppError;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    folders: BTreeMap<i64, Folder>,
    documents: BTreeMap<i64, Document>,
    grants: Vec<PermissionGrant>,
    next_grant_id: i64,
}

impl Tables {
    fn grants_where(&self, pred: impl Fn(&PermissionGrant) -> bool) -> Vec<PermissionGrant> {
        self.grants.iter().filter(|g| pred(g)).cloned().collect()
    }

    fn remove_grants_where(&mut self, pred: impl Fn(&PermissionGrant) -> bool) -> u64 {
        let before = self.grants.len();
        self.grants.retain(|g| !pred(g));
        (before - self.grants.len()) as u64
    }

    fn contents_of(&self, folder_id: i64) -> FolderContents {
        FolderContents {
            subfolders: self
                .folders
                .values()
                .filter(|f| f.parent_folder_id == Some(folder_id))
                .count() as i64,
            documents: self
                .documents
                .values()
                .filter(|d| d.folder_id == Some(folder_id))
                .count() as i64,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PermissionResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|e| {
            PermissionError::Store(AppError::DatabaseError(anyhow::anyhow!(
                "In-memory store lock poisoned: {}",
                e
            )))
        })
    }

    fn write(&self) -> PermissionResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|e| {
            PermissionError::Store(AppError::DatabaseError(anyhow::anyhow!(
                "In-memory store lock poisoned: {}",
                e
            )))
        })
    }

    pub fn insert_user(&self, user: User) -> PermissionResult<()> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn insert_folder(&self, folder: Folder) -> PermissionResult<()> {
        self.write()?.folders.insert(folder.id, folder);
        Ok(())
    }

    pub fn insert_document(&self, document: Document) -> PermissionResult<()> {
        self.write()?.documents.insert(document.id, document);
        Ok(())
    }

    pub fn grant_count(&self) -> PermissionResult<usize> {
        Ok(self.read()?.grants.len())
    }
}

fn newest_first(mut documents: Vec<Document>) -> Vec<Document> {
    documents.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    documents
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn health_check(&self) -> PermissionResult<()> {
        self.read().map(|_| ())
    }

    async fn find_user(&self, user_id: i64) -> PermissionResult<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn find_document(&self, document_id: i64) -> PermissionResult<Option<Document>> {
        Ok(self.read()?.documents.get(&document_id).cloned())
    }

    async fn find_folder(&self, folder_id: i64) -> PermissionResult<Option<Folder>> {
        Ok(self.read()?.folders.get(&folder_id).cloned())
    }

    async fn find_grant(&self, grant_id: i64) -> PermissionResult<Option<PermissionGrant>> {
        Ok(self.read()?.grants.iter().find(|g| g.id == grant_id).cloned())
    }

    async fn folder_of(&self, document_id: i64) -> PermissionResult<Option<Folder>> {
        let tables = self.read()?;
        Ok(tables
            .documents
            .get(&document_id)
            .and_then(|d| d.folder_id)
            .and_then(|folder_id| tables.folders.get(&folder_id))
            .cloned())
    }

    async fn documents_in_project(&self, project_id: i64) -> PermissionResult<Vec<Document>> {
        let tables = self.read()?;
        let documents = tables
            .documents
            .values()
            .filter(|d| d.project_id == Some(project_id))
            .cloned()
            .collect();
        Ok(newest_first(documents))
    }

    async fn documents_in_folder(&self, folder_id: i64) -> PermissionResult<Vec<Document>> {
        let tables = self.read()?;
        let documents = tables
            .documents
            .values()
            .filter(|d| d.folder_id == Some(folder_id))
            .cloned()
            .collect();
        Ok(newest_first(documents))
    }

    async fn grants_for_document(&self, document_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        Ok(self
            .read()?
            .grants_where(|g| g.target == GrantTarget::Document(document_id)))
    }

    async fn grants_for_folder(&self, folder_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        Ok(self
            .read()?
            .grants_where(|g| g.target == GrantTarget::Folder(folder_id)))
    }

    async fn grants_for_user(&self, user_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        Ok(self
            .read()?
            .grants_where(|g| g.grantee == Grantee::User(user_id)))
    }

    async fn grants_for_role(&self, role: Role) -> PermissionResult<Vec<PermissionGrant>> {
        Ok(self.read()?.grants_where(|g| g.grantee == Grantee::Role(role)))
    }

    #[instrument(skip(self))]
    async fn upsert_grant(
        &self,
        spec: &GrantSpec,
        granted_by: &str,
    ) -> PermissionResult<UpsertOutcome> {
        let mut tables = self.write()?;

        match spec.target() {
            GrantTarget::Document(id) if !tables.documents.contains_key(&id) => {
                return Err(PermissionError::NotFound(EntityRef::Document(id)));
            }
            GrantTarget::Folder(id) if !tables.folders.contains_key(&id) => {
                return Err(PermissionError::NotFound(EntityRef::Folder(id)));
            }
            _ => {}
        }
        if let Grantee::User(id) = spec.grantee() {
            if !tables.users.contains_key(&id) {
                return Err(PermissionError::NotFound(EntityRef::User(id)));
            }
        }

        let tables = &mut *tables;
        let next_grant_id = &mut tables.next_grant_id;
        let outcome = apply_upsert(&mut tables.grants, spec, granted_by, || {
            *next_grant_id += 1;
            *next_grant_id
        });
        debug!(grant_id = outcome.grant().id, action = outcome.action(), "Grant stored");
        Ok(outcome)
    }

    async fn delete_grant(&self, grant_id: i64) -> PermissionResult<bool> {
        Ok(self.write()?.remove_grants_where(|g| g.id == grant_id) > 0)
    }

    async fn folder_contents(&self, folder_id: i64) -> PermissionResult<FolderContents> {
        Ok(self.read()?.contents_of(folder_id))
    }

    #[instrument(skip(self))]
    async fn delete_document_cascade(&self, document_id: i64) -> PermissionResult<u64> {
        let mut tables = self.write()?;
        if tables.documents.remove(&document_id).is_none() {
            return Err(PermissionError::NotFound(EntityRef::Document(document_id)));
        }
        Ok(tables.remove_grants_where(|g| g.target == GrantTarget::Document(document_id)))
    }

    #[instrument(skip(self))]
    async fn delete_folder_cascade(&self, folder_id: i64) -> PermissionResult<u64> {
        let mut tables = self.write()?;
        if !tables.folders.contains_key(&folder_id) {
            return Err(PermissionError::NotFound(EntityRef::Folder(folder_id)));
        }
        tables.contents_of(folder_id).ensure_empty()?;

        tables.folders.remove(&folder_id);
        Ok(tables.remove_grants_where(|g| g.target == GrantTarget::Folder(folder_id)))
    }

    #[instrument(skip(self))]
    async fn delete_user_cascade(&self, user_id: i64) -> PermissionResult<u64> {
        let mut tables = self.write()?;
        if tables.users.remove(&user_id).is_none() {
            return Err(PermissionError::NotFound(EntityRef::User(user_id)));
        }
        Ok(tables.remove_grants_where(|g| g.grantee == Grantee::User(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PermissionLevel;

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_user(User::new(7, "jdoe", "Jane Doe", Role::User))
            .unwrap();
        store
            .insert_folder(Folder::new(10, 1, None, "Protocols", "admin"))
            .unwrap();
        store
            .insert_folder(Folder::new(11, 1, Some(10), "Amendments", "admin"))
            .unwrap();
        store
            .insert_document(Document::new(5, 1, Some(11), "consent.pdf", "admin"))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_target() {
        let store = seeded();
        let spec = GrantSpec::new(GrantTarget::Document(99), Grantee::User(7), PermissionLevel::Read);

        let err = store.upsert_grant(&spec, "admin").await.unwrap_err();

        assert!(matches!(err, PermissionError::NotFound(EntityRef::Document(99))));
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_grantee_user() {
        let store = seeded();
        let spec = GrantSpec::new(GrantTarget::Folder(10), Grantee::User(42), PermissionLevel::Read);

        let err = store.upsert_grant(&spec, "admin").await.unwrap_err();

        assert!(matches!(err, PermissionError::NotFound(EntityRef::User(42))));
    }

    #[tokio::test]
    async fn test_candidate_grants_include_folder_grants() {
        let store = seeded();
        let doc_spec = GrantSpec::new(GrantTarget::Document(5), Grantee::User(7), PermissionLevel::Read);
        let folder_spec =
            GrantSpec::new(GrantTarget::Folder(11), Grantee::Role(Role::User), PermissionLevel::Write);
        let other_spec =
            GrantSpec::new(GrantTarget::Folder(10), Grantee::Role(Role::User), PermissionLevel::Read);
        for spec in [doc_spec, folder_spec, other_spec] {
            store.upsert_grant(&spec, "admin").await.unwrap();
        }

        let document = store.find_document(5).await.unwrap().unwrap();
        let grants = store.candidate_grants(&document).await.unwrap();

        assert_eq!(grants.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_cascade_refuses_parent_folder() {
        let store = seeded();

        let err = store.delete_folder_cascade(10).await.unwrap_err();

        assert!(matches!(err, PermissionError::Conflict(_)));
        assert!(store.find_folder(10).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_document_cascade_removes_only_its_grants() {
        let store = seeded();
        store
            .upsert_grant(
                &GrantSpec::new(GrantTarget::Document(5), Grantee::User(7), PermissionLevel::Delete),
                "admin",
            )
            .await
            .unwrap();
        store
            .upsert_grant(
                &GrantSpec::new(GrantTarget::Folder(11), Grantee::User(7), PermissionLevel::Read),
                "admin",
            )
            .await
            .unwrap();

        let removed = store.delete_document_cascade(5).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.grant_count().unwrap(), 1);
        assert!(store.find_document(5).await.unwrap().is_none());
    }
}
