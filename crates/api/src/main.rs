//! Tenancy notification API server binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tenancy_common::config::AppConfig;
use tenancy_common::error::AppError;
use tenancy_notifier::Notifier;

use tenancy_api::routes::create_router;
use tenancy_api::state::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("tenancy_api=info,tenancy_notifier=info,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting tenancy notification API...");

    // Load configuration
    let config = AppConfig::from_env()?;
    config.log_summary();
    if !config.readiness().any_whatsapp() {
        tracing::warn!("No WhatsApp provider configured, WhatsApp sends will fail");
    }

    // Build channel clients for every configured channel
    let notifier = Notifier::from_config(&config).map_err(AppError::from)?;
    let state = AppState::new(notifier.clone());

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued emails finish before exiting
    let queue = notifier.email_queue();
    if queue.is_busy() {
        tracing::info!(pending = queue.pending(), "Draining email queue...");
        queue.wait_idle().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
