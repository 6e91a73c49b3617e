//! Postgres entity store for trialsite-service.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};

use super::store::{EntityStore, FolderContents};
use crate::models::{
    Document, DocumentRow, Folder, GrantTarget, Grantee, PermissionGrant, PermissionGrantRow, Role,
    User, UserRow,
};
use crate::permissions::error::EntityRef;
use crate::permissions::{GrantSpec, PermissionError, PermissionResult, UpsertOutcome};

const DOCUMENT_COLUMNS: &str = "id, project_id, folder_id, file_name, original_file_name, \
     file_size, document_type, description, uploaded_by, uploaded_at";

const FOLDER_COLUMNS: &str =
    "id, folder_name, description, project_id, parent_folder_id, created_by, created_at";

const GRANT_COLUMNS: &str =
    "id, permission_type, document_id, folder_id, user_id, role_name, granted_by, granted_at";

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> PermissionError {
    move |e| PermissionError::Store(AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e)))
}

fn corrupt_row(e: String) -> PermissionError {
    PermissionError::Store(AppError::DatabaseError(anyhow::anyhow!(e)))
}

fn into_grants(rows: Vec<PermissionGrantRow>) -> PermissionResult<Vec<PermissionGrant>> {
    rows.into_iter()
        .map(|row| PermissionGrant::try_from(row).map_err(corrupt_row))
        .collect()
}

/// Column values for a grant key, one of each pair set.
struct KeyColumns {
    document_id: Option<i64>,
    folder_id: Option<i64>,
    user_id: Option<i64>,
    role_name: Option<&'static str>,
}

impl From<&GrantSpec> for KeyColumns {
    fn from(spec: &GrantSpec) -> Self {
        Self {
            document_id: spec.target().document_id(),
            folder_id: spec.target().folder_id(),
            user_id: spec.grantee().user_id(),
            role_name: spec.grantee().role().map(|r| r.as_str()),
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "trialsite-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Seeding (used by tooling and tests)
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_user(
        &self,
        username: &str,
        full_name: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, full_name, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, full_name, role, created_utc
            "#,
        )
        .bind(username)
        .bind(full_name)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Username '{}' already exists", username))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        User::try_from(row).map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    #[instrument(skip(self))]
    pub async fn create_project(&self, project_name: &str) -> Result<i64, AppError> {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO projects (project_name) VALUES ($1) RETURNING id")
                .bind(project_name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to create project: {}", e))
                })?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn create_folder(
        &self,
        project_id: i64,
        parent_folder_id: Option<i64>,
        folder_name: &str,
        created_by: &str,
    ) -> Result<Folder, AppError> {
        sqlx::query_as::<_, Folder>(&format!(
            "INSERT INTO folders (project_id, parent_folder_id, folder_name, created_by) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(project_id)
        .bind(parent_folder_id)
        .bind(folder_name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create folder: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn create_document(
        &self,
        project_id: i64,
        folder_id: Option<i64>,
        original_file_name: &str,
        uploaded_by: &str,
    ) -> Result<Document, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents (project_id, folder_id, file_name, original_file_name, uploaded_by) \
             VALUES ($1, $2, $3, $3, $4) RETURNING {}",
            DOCUMENT_COLUMNS
        ))
        .bind(project_id)
        .bind(folder_id)
        .bind(original_file_name)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create document: {}", e)))?;
        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // Transaction helpers
    // -------------------------------------------------------------------------

    async fn exists(
        tx: &mut Transaction<'_, Postgres>,
        table: &'static str,
        id: i64,
    ) -> PermissionResult<bool> {
        let found: Option<(i64,)> =
            sqlx::query_as(&format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", table))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(db_error("Failed to lock row"))?;
        Ok(found.is_some())
    }

    async fn contents_in(
        tx: &mut Transaction<'_, Postgres>,
        folder_id: i64,
    ) -> PermissionResult<FolderContents> {
        let (subfolders, documents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM folders WHERE parent_folder_id = $1),
                (SELECT COUNT(*) FROM documents WHERE folder_id = $1)
            "#,
        )
        .bind(folder_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("Failed to count folder contents"))?;

        Ok(FolderContents {
            subfolders,
            documents,
        })
    }

    async fn grants_where(&self, predicate: &str, id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            "SELECT {} FROM document_permissions WHERE {} = $1 ORDER BY id",
            GRANT_COLUMNS, predicate
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load grants"))?;
        into_grants(rows)
    }
}

#[async_trait]
impl EntityStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> PermissionResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user(&self, user_id: i64) -> PermissionResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, full_name, role, created_utc FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get user"))?;

        row.map(User::try_from).transpose().map_err(corrupt_row)
    }

    #[instrument(skip(self))]
    async fn find_document(&self, document_id: i64) -> PermissionResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get document"))?;
        Ok(row.map(Document::from))
    }

    #[instrument(skip(self))]
    async fn find_folder(&self, folder_id: i64) -> PermissionResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT {} FROM folders WHERE id = $1",
            FOLDER_COLUMNS
        ))
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get folder"))
    }

    #[instrument(skip(self))]
    async fn find_grant(&self, grant_id: i64) -> PermissionResult<Option<PermissionGrant>> {
        Ok(self.grants_where("id", grant_id).await?.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn folder_of(&self, document_id: i64) -> PermissionResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            r#"
            SELECT f.id, f.folder_name, f.description, f.project_id, f.parent_folder_id,
                   f.created_by, f.created_at
            FROM documents d
            JOIN folders f ON f.id = d.folder_id
            WHERE d.id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get document folder"))
    }

    #[instrument(skip(self))]
    async fn documents_in_project(&self, project_id: i64) -> PermissionResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE project_id = $1 ORDER BY uploaded_at DESC, id DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list project documents"))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    #[instrument(skip(self))]
    async fn documents_in_folder(&self, folder_id: i64) -> PermissionResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE folder_id = $1 ORDER BY uploaded_at DESC, id DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list folder documents"))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    #[instrument(skip(self))]
    async fn grants_for_document(&self, document_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        self.grants_where("document_id", document_id).await
    }

    #[instrument(skip(self))]
    async fn grants_for_folder(&self, folder_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        self.grants_where("folder_id", folder_id).await
    }

    #[instrument(skip(self))]
    async fn grants_for_user(&self, user_id: i64) -> PermissionResult<Vec<PermissionGrant>> {
        self.grants_where("user_id", user_id).await
    }

    #[instrument(skip(self))]
    async fn grants_for_role(&self, role: Role) -> PermissionResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            "SELECT {} FROM document_permissions WHERE role_name = $1 ORDER BY id",
            GRANT_COLUMNS
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load role grants"))?;
        into_grants(rows)
    }

    #[instrument(skip(self), fields(level = %spec.level))]
    async fn upsert_grant(
        &self,
        spec: &GrantSpec,
        granted_by: &str,
    ) -> PermissionResult<UpsertOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let target_exists = match spec.target() {
            GrantTarget::Document(id) => Self::exists(&mut tx, "documents", id).await?,
            GrantTarget::Folder(id) => Self::exists(&mut tx, "folders", id).await?,
        };
        if !target_exists {
            return Err(PermissionError::NotFound(match spec.target() {
                GrantTarget::Document(id) => EntityRef::Document(id),
                GrantTarget::Folder(id) => EntityRef::Folder(id),
            }));
        }
        if let Grantee::User(id) = spec.grantee() {
            if !Self::exists(&mut tx, "users", id).await? {
                return Err(PermissionError::NotFound(EntityRef::User(id)));
            }
        }

        let key = KeyColumns::from(spec);
        let existing: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM document_permissions
            WHERE document_id IS NOT DISTINCT FROM $1
              AND folder_id IS NOT DISTINCT FROM $2
              AND user_id IS NOT DISTINCT FROM $3
              AND role_name IS NOT DISTINCT FROM $4
            FOR UPDATE
            "#,
        )
        .bind(key.document_id)
        .bind(key.folder_id)
        .bind(key.user_id)
        .bind(key.role_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to look up grant"))?;

        let outcome = match existing {
            Some((grant_id,)) => {
                let row = sqlx::query_as::<_, PermissionGrantRow>(&format!(
                    "UPDATE document_permissions SET permission_type = $2 WHERE id = $1 RETURNING {}",
                    GRANT_COLUMNS
                ))
                .bind(grant_id)
                .bind(spec.level.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("Failed to update grant"))?;
                UpsertOutcome::Updated(PermissionGrant::try_from(row).map_err(corrupt_row)?)
            }
            None => {
                let row = sqlx::query_as::<_, PermissionGrantRow>(&format!(
                    "INSERT INTO document_permissions \
                     (permission_type, document_id, folder_id, user_id, role_name, granted_by) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
                    GRANT_COLUMNS
                ))
                .bind(spec.level.as_str())
                .bind(key.document_id)
                .bind(key.folder_id)
                .bind(key.user_id)
                .bind(key.role_name)
                .bind(granted_by)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match e {
                    // A concurrent writer inserted the same key first.
                    sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                        PermissionError::Conflict("grant was written concurrently".to_string())
                    }
                    _ => db_error("Failed to insert grant")(e),
                })?;
                UpsertOutcome::Inserted(PermissionGrant::try_from(row).map_err(corrupt_row)?)
            }
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit grant"))?;

        info!(
            grant_id = outcome.grant().id,
            action = outcome.action(),
            "Grant stored"
        );
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn delete_grant(&self, grant_id: i64) -> PermissionResult<bool> {
        let result = sqlx::query("DELETE FROM document_permissions WHERE id = $1")
            .bind(grant_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete grant"))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn folder_contents(&self, folder_id: i64) -> PermissionResult<FolderContents> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        let contents = Self::contents_in(&mut tx, folder_id).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(contents)
    }

    #[instrument(skip(self))]
    async fn delete_document_cascade(&self, document_id: i64) -> PermissionResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !Self::exists(&mut tx, "documents", document_id).await? {
            return Err(PermissionError::NotFound(EntityRef::Document(document_id)));
        }

        let removed = sqlx::query("DELETE FROM document_permissions WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete document grants"))?
            .rows_affected();

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete document"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit document delete"))?;

        info!(document_id, grants_removed = removed, "Document deleted");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn delete_folder_cascade(&self, folder_id: i64) -> PermissionResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !Self::exists(&mut tx, "folders", folder_id).await? {
            return Err(PermissionError::NotFound(EntityRef::Folder(folder_id)));
        }
        Self::contents_in(&mut tx, folder_id).await?.ensure_empty()?;

        let removed = sqlx::query("DELETE FROM document_permissions WHERE folder_id = $1")
            .bind(folder_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folder grants"))?
            .rows_affected();

        sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(folder_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folder"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit folder delete"))?;

        info!(folder_id, grants_removed = removed, "Folder deleted");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn delete_user_cascade(&self, user_id: i64) -> PermissionResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !Self::exists(&mut tx, "users", user_id).await? {
            return Err(PermissionError::NotFound(EntityRef::User(user_id)));
        }

        let removed = sqlx::query("DELETE FROM document_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete user grants"))?
            .rows_affected();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete user"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit user delete"))?;

        info!(user_id, grants_removed = removed, "User deleted");
        Ok(removed)
    }
}
