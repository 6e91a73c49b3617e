use crate::config::{StoreBackend, TrialsiteConfig};
use crate::handlers;
use crate::permissions::PermissionService;
use crate::services::{Database, EntityStore, InMemoryStore};
use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: TrialsiteConfig,
    pub store: Arc<dyn EntityStore>,
    pub permissions: PermissionService,
}

impl AppState {
    pub fn new(config: TrialsiteConfig, store: Arc<dyn EntityStore>) -> Self {
        Self {
            config,
            permissions: PermissionService::new(store.clone()),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<dyn EntityStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

/// Build the HTTP router over an already constructed state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/permissions", post(handlers::grant_permission))
        .route(
            "/permissions/document/:document_id",
            get(handlers::document_permissions),
        )
        .route(
            "/permissions/folder/:folder_id",
            get(handlers::folder_permissions),
        )
        .route("/permissions/role/:role_name", get(handlers::role_permissions))
        .route(
            "/permissions/:permission_id",
            delete(handlers::revoke_permission),
        )
        .route(
            "/documents/project/:project_id",
            get(handlers::project_documents),
        )
        .route("/documents/folder/:folder_id", get(handlers::folder_documents))
        .route(
            "/documents/stats/project/:project_id",
            get(handlers::project_stats),
        )
        .route(
            "/documents/:document_id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/documents/:document_id/access", get(handlers::check_access))
        .route("/folders/:folder_id", delete(handlers::delete_folder))
        .route("/users/:user_id", delete(handlers::delete_user))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Connect the configured entity store.
pub async fn connect_store(config: &TrialsiteConfig) -> Result<Arc<dyn EntityStore>, AppError> {
    match config.store {
        StoreBackend::Postgres => {
            let db = Database::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to PostgreSQL: {}", e);
                e
            })?;
            db.run_migrations().await.map_err(|e| {
                tracing::error!("Failed to run database migrations: {}", e);
                e
            })?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory entity store; data is not persisted");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: TrialsiteConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        Self::build_with_store(config, store).await
    }

    pub async fn build_with_store(
        config: TrialsiteConfig,
        store: Arc<dyn EntityStore>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), store);
        let app = build_router(state.clone());

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, store = ?config.store, "Listening");

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
