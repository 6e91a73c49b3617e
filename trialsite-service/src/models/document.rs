//! Document and folder models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Document categories used across trial projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Contract,
    Proposal,
    Deliverable,
    Report,
    TrainingMaterial,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Contract,
        DocumentType::Proposal,
        DocumentType::Deliverable,
        DocumentType::Report,
        DocumentType::TrainingMaterial,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Contract => "CONTRACT",
            DocumentType::Proposal => "PROPOSAL",
            DocumentType::Deliverable => "DELIVERABLE",
            DocumentType::Report => "REPORT",
            DocumentType::TrainingMaterial => "TRAINING_MATERIAL",
            DocumentType::Other => "OTHER",
        }
    }

    /// Unknown or missing codes count as `Other`.
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CONTRACT" => DocumentType::Contract,
            "PROPOSAL" => DocumentType::Proposal,
            "DELIVERABLE" => DocumentType::Deliverable,
            "REPORT" => DocumentType::Report,
            "TRAINING_MATERIAL" => DocumentType::TrainingMaterial,
            _ => DocumentType::Other,
        }
    }
}

/// Document entity.
///
/// `project_id` is mandatory in the schema. A row without one is a
/// data-integrity anomaly: batch reads drop it, single-item reads treat it
/// as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
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

impl Document {
    /// Create a document record with an uploaded-now timestamp.
    pub fn new(
        id: i64,
        project_id: i64,
        folder_id: Option<i64>,
        original_file_name: impl Into<String>,
        uploaded_by: impl Into<String>,
    ) -> Self {
        let original_file_name = original_file_name.into();
        Self {
            id,
            project_id: Some(project_id),
            folder_id,
            file_name: original_file_name.clone(),
            original_file_name,
            file_size: 0,
            document_type: DocumentType::Other,
            description: None,
            uploaded_by: uploaded_by.into(),
            uploaded_at: Utc::now(),
        }
    }

    pub fn has_project(&self) -> bool {
        self.project_id.is_some()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: i64,
    pub project_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub file_name: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub document_type: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            folder_id: row.folder_id,
            file_name: row.file_name,
            original_file_name: row.original_file_name,
            file_size: row.file_size,
            document_type: row
                .document_type
                .as_deref()
                .map(DocumentType::parse)
                .unwrap_or(DocumentType::Other),
            description: row.description,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at,
        }
    }
}

/// Folder entity. Folders form a tree per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: i64,
    pub folder_name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub parent_folder_id: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(
        id: i64,
        project_id: i64,
        parent_folder_id: Option<i64>,
        folder_name: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id,
            folder_name: folder_name.into(),
            description: None,
            project_id,
            parent_folder_id,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}
