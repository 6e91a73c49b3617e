//! Document and folder permission resolution.
//!
//! `guard` holds the privileged-role bypass, `resolver` decides a single
//! document, `filter` narrows collections, and `upsert` defines grant
//! identity. `service` wires them to an [`crate::services::EntityStore`].

pub mod error;
pub mod filter;
pub mod guard;
pub mod resolver;
pub mod service;
pub mod upsert;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EntityRef, PermissionError, PermissionResult};
pub use filter::{filter_visible, VisibilityIndex};
pub use guard::{is_administrator, is_privileged, require_administrator, require_privileged};
pub use resolver::{has_permission, level_allows};
pub use service::{DocumentStats, PermissionService};
pub use upsert::{GrantSpec, UpsertOutcome};
