use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;

use crate::middleware::CurrentUser;
use crate::permissions::require_privileged;
use crate::startup::AppState;

/// Delete an empty folder and its grants.
///
/// DELETE /folders/:folder_id
pub async fn delete_folder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(folder_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_privileged(&user)?;
    state.permissions.delete_folder(folder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
