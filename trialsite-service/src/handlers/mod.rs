pub mod documents;
pub mod folders;
pub mod health;
pub mod permissions;
pub mod users;

pub use documents::{
    check_access, delete_document, folder_documents, get_document, project_documents,
    project_stats,
};
pub use folders::delete_folder;
pub use health::{health_check, metrics_endpoint};
pub use permissions::{
    document_permissions, folder_permissions, grant_permission, revoke_permission,
    role_permissions,
};
pub use users::delete_user;
