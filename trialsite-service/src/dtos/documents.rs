use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Document, DocumentType, PermissionLevel};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: i64,
    pub project_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub file_name: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            project_id: document.project_id,
            folder_id: document.folder_id,
            file_name: document.file_name,
            original_file_name: document.original_file_name,
            file_size: document.file_size,
            document_type: document.document_type,
            description: document.description,
            uploaded_by: document.uploaded_by,
            uploaded_at: document.uploaded_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    /// Defaults to READ.
    pub level: Option<PermissionLevel>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub document_id: i64,
    pub level: PermissionLevel,
    pub allowed: bool,
}
