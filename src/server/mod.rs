//! HTTP façade over lesson generation and the index cache

mod error;
mod payload;
mod routes;

pub use error::{ApiError, ErrorResponse};
pub use payload::{LessonRequest, LessonResponse, SourceDocument, StatusResponse};

use crate::config::Config;
use crate::curriculum::SubjectCatalog;
use crate::error::{Result, TutorError};
use crate::index::IndexCacheManager;
use crate::lesson::{ComponentRegistry, GenerationProvider, LessonOrchestrator};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<LessonOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: LessonOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire catalog, embedding provider, index cache and registry from config
    pub fn from_config(config: &Config, generator: Arc<dyn GenerationProvider>) -> Result<Self> {
        let catalog = SubjectCatalog::from_config(config)?;
        let cache = IndexCacheManager::from_config(config)?;
        let embedder = cache.embedder().clone();

        let orchestrator = LessonOrchestrator::new(
            Arc::new(catalog),
            Arc::new(ComponentRegistry::new(Arc::new(cache))),
            embedder,
            generator,
            config.retrieval.top_k,
            config.retrieval.ef_search,
        );
        Ok(Self::new(orchestrator))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(routes::status))
        .route("/rebuild", post(routes::rebuild))
        .route("/lesson", post(routes::lesson))
        .route("/examples", get(routes::examples))
        .route("/subjects", get(routes::subjects))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C, preparing the default subject's index in the background
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    if let Some(subject) = state.orchestrator.catalog().default_subject().cloned() {
        let registry = state.orchestrator.registry().clone();
        tokio::spawn(async move {
            match registry.get_or_load(&subject).await {
                Ok(_) => info!("Default subject {} ready", subject.name),
                Err(e) => warn!(
                    "Default subject {} not ready: {}. Lessons will return 503 until /rebuild succeeds.",
                    subject.name, e
                ),
            }
        });
    }

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TutorError::io(e, format!("Failed to bind {}", addr)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TutorError::io(e, "Server error"))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
