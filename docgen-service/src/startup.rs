//! Application startup and lifecycle management.

use crate::config::{CorsPolicy, DocgenConfig};
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{LocalTemplateStore, MongoTenderRepository, TemplateStore, TenderRepository};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::config::is_production;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Upper bound for an uploaded template.
const MAX_TEMPLATE_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub tenders: Arc<dyn TenderRepository>,
    pub text_provider: Arc<dyn TextProvider>,
    pub templates: Arc<dyn TemplateStore>,
}

/// Health probes at the root, the document generator under `/docgen`.
pub fn build_router(state: AppState, cors: &CorsPolicy) -> Router {
    let docgen = Router::new()
        .route("/upload-template", post(handlers::upload_template))
        .route("/generate-document", post(handlers::generate_document))
        .route("/map-fields", post(handlers::map_fields))
        .route("/tenders", get(handlers::list_tenders))
        .route("/tenders/:tender_id", get(handlers::get_tender))
        .route("/tenders/:tender_id/fields", get(handlers::get_tender_fields))
        .layer(DefaultBodyLimit::max(MAX_TEMPLATE_BYTES));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/docgen", docgen)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors.layer())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: DocgenConfig) -> Result<Self, AppError> {
        let cors = config.cors_policy(is_production())?;

        let tenders = MongoTenderRepository::connect(
            &config.mongodb.uri,
            &config.mongodb.database,
            &config.mongodb.tenders_collection,
        )
        .await?;

        let provider = GeminiTextProvider::new(GeminiConfig {
            api_key: config.google.api_key.clone(),
            model: config.google.model.clone(),
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
        tracing::info!(model = %provider.model(), "Initialized Gemini text provider");

        let templates = LocalTemplateStore::new(&config.storage.local_path)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to initialize template storage at {}: {}",
                    config.storage.local_path,
                    e
                );
                e
            })?;

        let state = AppState {
            tenders: Arc::new(tenders),
            text_provider: Arc::new(provider),
            templates: Arc::new(templates),
        };

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(cors = ?cors, "Docgen service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state, &cors),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
