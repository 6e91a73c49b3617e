use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use service_core::error::AppError;
use std::sync::Arc;

use crate::models::User;
use crate::services::EntityStore;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Caller resolved from the `X-User-ID` header set by the trusted gateway.
///
/// The role is read from the store on every request, so a role change
/// takes effect on the next call.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<dyn EntityStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-User-ID header")))?;

        let user_id: i64 = raw
            .trim()
            .parse()
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Malformed X-User-ID header")))?;

        let store = Arc::<dyn EntityStore>::from_ref(state);
        let user = store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown user {}", user_id)))?;

        tracing::debug!(user_id = user.id, role = %user.role, "Resolved caller");

        Ok(CurrentUser(user))
    }
}
