//! trialsite-service: document and folder permissions for clinical trial sites.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::{build_router, AppState, Application};
