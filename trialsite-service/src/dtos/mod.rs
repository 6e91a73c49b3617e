pub mod documents;
pub mod permissions;

pub use documents::{AccessQuery, AccessResponse, DocumentResponse};
pub use permissions::{PermissionRequest, PermissionResponse};
