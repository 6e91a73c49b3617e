use service_core::error::AppError;
use thiserror::Error;

/// Entity referenced by a permission operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Document(i64),
    Folder(i64),
    User(i64),
    Grant(i64),
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Document(id) => write!(f, "Document {}", id),
            EntityRef::Folder(id) => write!(f, "Folder {}", id),
            EntityRef::User(id) => write!(f, "User {}", id),
            EntityRef::Grant(id) => write!(f, "Permission {}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("{0} not found")]
    NotFound(EntityRef),

    #[error("Invalid permission grant: {0}")]
    InvalidGrantSpec(&'static str),

    #[error("Document {document_id} has no project")]
    DataIntegrity { document_id: i64 },

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<sqlx::Error> for PermissionError {
    fn from(err: sqlx::Error) -> Self {
        PermissionError::Store(AppError::DatabaseError(anyhow::anyhow!(err)))
    }
}

impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::NotFound(entity) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", entity))
            }
            PermissionError::InvalidGrantSpec(reason) => AppError::BadRequest(anyhow::anyhow!(reason)),
            // Single-item reads have no fallback for an orphaned document.
            PermissionError::DataIntegrity { document_id } => {
                AppError::NotFound(anyhow::anyhow!("Document {} not found", document_id))
            }
            PermissionError::Forbidden(reason) => AppError::Forbidden(anyhow::anyhow!(reason)),
            PermissionError::Conflict(reason) => AppError::Conflict(anyhow::anyhow!(reason)),
            PermissionError::Store(e) => e,
        }
    }
}

pub type PermissionResult<T> = Result<T, PermissionError>;
