//! Creditbook Service - HTTP API for the credit ledger.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creditbook_service::{create_router, load_catalog, open_store, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,creditbook=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Creditbook Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        storage_backend = ?config.storage_backend,
        data_dir = %config.data_dir,
        pricing_file = ?config.pricing_file,
        "Service configuration loaded"
    );

    let catalog = load_catalog(&config)?;
    let store = open_store(&config)?;

    let state = AppState::new(store, catalog, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
