//! Grant management handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{PermissionRequest, PermissionResponse};
use crate::middleware::CurrentUser;
use crate::models::Role;
use crate::permissions::require_privileged;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn to_responses(grants: Vec<crate::models::PermissionGrant>) -> Json<Vec<PermissionResponse>> {
    Json(grants.into_iter().map(PermissionResponse::from).collect())
}

/// Create or update a grant.
///
/// POST /permissions
pub async fn grant_permission(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<PermissionRequest>,
) -> Result<Json<PermissionResponse>, AppError> {
    require_privileged(&user)?;

    let spec = req.to_spec()?;
    let grant = state.permissions.upsert_grant(spec, &user.username).await?;

    Ok(Json(PermissionResponse::from(grant)))
}

/// GET /permissions/document/:document_id
pub async fn document_permissions(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(document_id): Path<i64>,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    let grants = state.permissions.list_document_grants(document_id).await?;
    Ok(to_responses(grants))
}

/// GET /permissions/folder/:folder_id
pub async fn folder_permissions(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    let grants = state.permissions.list_folder_grants(folder_id).await?;
    Ok(to_responses(grants))
}

/// GET /permissions/role/:role_name
pub async fn role_permissions(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(role_name): Path<String>,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    let role: Role = role_name
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let grants = state.permissions.list_role_grants(role).await?;
    Ok(to_responses(grants))
}

/// DELETE /permissions/:permission_id
pub async fn revoke_permission(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(permission_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_privileged(&user)?;
    state.permissions.revoke_grant(permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
