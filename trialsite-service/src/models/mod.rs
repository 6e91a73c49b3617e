pub mod document;
pub mod grant;
pub mod role;
pub mod user;

pub use document::{Document, DocumentRow, DocumentType, Folder};
pub use grant::{
    GrantKey, GrantTarget, Grantee, PermissionGrant, PermissionGrantRow, PermissionLevel,
};
pub use role::Role;
pub use user::{User, UserRow};
