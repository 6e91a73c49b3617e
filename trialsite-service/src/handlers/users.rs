use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;

use crate::middleware::CurrentUser;
use crate::permissions::require_administrator;
use crate::startup::AppState;

/// Delete a user and every grant that names them.
///
/// DELETE /users/:user_id
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_administrator(&admin)?;
    state.permissions.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
