use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{PermissionGrant, PermissionLevel, Role};
use crate::permissions::{GrantSpec, PermissionResult};

/// Grant request. Exactly one of `documentId`/`folderId` and exactly one of
/// `userId`/`role` must be present. The grantor is always the caller.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub permission_type: PermissionLevel,

    #[validate(range(min = 1, message = "documentId must be positive"))]
    pub document_id: Option<i64>,

    #[validate(range(min = 1, message = "folderId must be positive"))]
    pub folder_id: Option<i64>,

    #[validate(range(min = 1, message = "userId must be positive"))]
    pub user_id: Option<i64>,

    pub role: Option<Role>,
}

impl PermissionRequest {
    pub fn to_spec(&self) -> PermissionResult<GrantSpec> {
        GrantSpec::from_parts(
            self.document_id,
            self.folder_id,
            self.user_id,
            self.role,
            self.permission_type,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub id: i64,
    pub permission_type: PermissionLevel,
    pub document_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub user_id: Option<i64>,
    pub role: Option<Role>,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
}

impl From<PermissionGrant> for PermissionResponse {
    fn from(grant: PermissionGrant) -> Self {
        Self {
            id: grant.id,
            permission_type: grant.level,
            document_id: grant.target.document_id(),
            folder_id: grant.target.folder_id(),
            user_id: grant.grantee.user_id(),
            role: grant.grantee.role(),
            granted_by: grant.granted_by,
            granted_at: grant.granted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_non_positive_ids() {
        let request: PermissionRequest = serde_json::from_value(serde_json::json!({
            "permissionType": "READ",
            "documentId": 0,
            "userId": 7
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_maps_to_folder_role_spec() {
        let request: PermissionRequest = serde_json::from_value(serde_json::json!({
            "permissionType": "WRITE",
            "folderId": 3,
            "role": "AUDITOR"
        }))
        .unwrap();

        let spec = request.to_spec().unwrap();

        assert_eq!(spec.level, PermissionLevel::Write);
        assert_eq!(spec.target().folder_id(), Some(3));
        assert_eq!(spec.grantee().role(), Some(Role::Auditor));
    }

    #[test]
    fn test_request_ignores_client_supplied_grantor() {
        let request: PermissionRequest = serde_json::from_value(serde_json::json!({
            "permissionType": "READ",
            "documentId": 5,
            "role": "USER",
            "grantedBy": "someone-else"
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.to_spec().unwrap().grantee().role(), Some(Role::User));
    }

    #[test]
    fn test_response_names_role_field() {
        let grant = crate::permissions::testing::grant(
            1,
            PermissionLevel::Read,
            crate::models::GrantTarget::Folder(3),
            crate::models::Grantee::Role(Role::Auditor),
        );

        let body = serde_json::to_value(PermissionResponse::from(grant)).unwrap();

        assert_eq!(body["role"], "AUDITOR");
        assert!(body.get("roleName").is_none());
    }
}
