//! Common test utilities for trialsite-service integration tests.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use tower::ServiceExt;
use trialsite_service::config::{DatabaseConfig, StoreBackend, TrialsiteConfig};
use trialsite_service::models::{Document, Folder, Role, User};
use trialsite_service::services::InMemoryStore;
use trialsite_service::{build_router, AppState};

static INIT: Once = Once::new();

pub const ADMIN: i64 = 1;
pub const DOCTOR: i64 = 2;
pub const STUDY_USER: i64 = 7;
pub const AUDITOR: i64 = 8;

pub const PROJECT: i64 = 100;
pub const ROOT_FOLDER: i64 = 10;
pub const SUB_FOLDER: i64 = 11;

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,trialsite_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config() -> TrialsiteConfig {
    TrialsiteConfig {
        common: CommonConfig::ephemeral(),
        environment: "test".to_string(),
        service_name: "trialsite-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    /// Router over an in-memory store seeded with one user per role, a
    /// project with a folder and a subfolder, and no grants.
    pub fn spawn() -> Self {
        init_tracing();

        let store = Arc::new(InMemoryStore::new());
        for user in [
            User::new(ADMIN, "admin", "Site Admin", Role::Admin),
            User::new(DOCTOR, "drwho", "Dr Who", Role::Doctor),
            User::new(STUDY_USER, "jdoe", "Jane Doe", Role::User),
            User::new(AUDITOR, "audit", "Al Auditor", Role::Auditor),
        ] {
            store.insert_user(user).expect("seed user");
        }
        store
            .insert_folder(Folder::new(ROOT_FOLDER, PROJECT, None, "Protocols", "admin"))
            .expect("seed folder");
        store
            .insert_folder(Folder::new(SUB_FOLDER, PROJECT, Some(ROOT_FOLDER), "Amendments", "admin"))
            .expect("seed folder");

        let state = AppState::new(test_config(), store.clone());
        Self {
            router: build_router(state),
            store,
        }
    }

    pub fn add_document(&self, id: i64, folder_id: Option<i64>) -> Document {
        let document = Document::new(id, PROJECT, folder_id, format!("doc-{}.pdf", id), "admin");
        self.store
            .insert_document(document.clone())
            .expect("seed document");
        document
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header("X-User-ID", id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user_id: i64) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn delete(&self, uri: &str, user_id: i64) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(user_id), None).await
    }

    pub async fn grant(&self, actor: i64, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, "/permissions", Some(actor), Some(body))
            .await
    }
}

pub fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|d| d["id"].as_i64().expect("id"))
        .collect()
}
