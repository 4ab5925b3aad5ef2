use docgen_service::config::DocgenConfig;
use docgen_service::startup::Application;
use service_core::observability::{
    init_metrics, init_tracing, otlp_endpoint_from_env, shutdown_tracing,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let otlp_endpoint = otlp_endpoint_from_env();
    init_tracing("docgen-service", &log_level, otlp_endpoint.as_deref());

    init_metrics().map_err(|e| {
        tracing::error!("Failed to initialize metrics: {}", e);
        std::io::Error::other(format!("Metrics error: {}", e))
    })?;

    let config = DocgenConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    let result = application.run_until_stopped().await;
    if let Err(e) = &result {
        tracing::error!("Server error: {}", e);
    }

    shutdown_tracing();
    result
}
