//! Document read and delete handlers. Every path goes through the
//! permission service; listings are filtered, single items are checked.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{AccessQuery, AccessResponse, DocumentResponse};
use crate::middleware::CurrentUser;
use crate::models::{Document, PermissionLevel};
use crate::permissions::DocumentStats;
use crate::startup::AppState;

fn to_responses(documents: Vec<Document>) -> Json<Vec<DocumentResponse>> {
    Json(documents.into_iter().map(DocumentResponse::from).collect())
}

/// GET /documents/project/:project_id
pub async fn project_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let documents = state
        .permissions
        .visible_documents_in_project(&user, project_id)
        .await?;
    Ok(to_responses(documents))
}

/// GET /documents/folder/:folder_id
pub async fn folder_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let documents = state
        .permissions
        .visible_documents_in_folder(&user, folder_id)
        .await?;
    Ok(to_responses(documents))
}

/// GET /documents/stats/project/:project_id
pub async fn project_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
) -> Result<Json<DocumentStats>, AppError> {
    let stats = state
        .permissions
        .project_document_stats(&user, project_id)
        .await?;
    Ok(Json(stats))
}

/// GET /documents/:document_id
pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(document_id): Path<i64>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .permissions
        .authorize_document(&user, document_id, PermissionLevel::Read)
        .await?;
    Ok(Json(DocumentResponse::from(document)))
}

/// GET /documents/:document_id/access?level=DELETE
pub async fn check_access(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(document_id): Path<i64>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, AppError> {
    let level = query.level.unwrap_or(PermissionLevel::Read);
    let allowed = state
        .permissions
        .check_document_access(&user, document_id, level)
        .await?;

    Ok(Json(AccessResponse {
        document_id,
        level,
        allowed,
    }))
}

/// DELETE /documents/:document_id
pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(document_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.permissions.delete_document(&user, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
