use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gyb_chat::{configuration::ServerConfig, routes, state::AppState, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gyb_chat=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::parse();
    let credentials = Credentials::from_env()
        .context("OPENAI_KEY (or OPENAI_API_KEY) must be set")?;

    let state = AppState::from_config(&config, credentials)?;
    let shutdown = state.shutdown.clone();
    let app = routes::configure(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
