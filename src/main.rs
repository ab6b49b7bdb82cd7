//! agu-bridge - HTTP Server Entry Point
//!
//! Starts the HTTP server that serves the Teams bot and the Copilot Extension.

use agu_bridge::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agu_bridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: dev_mode={}, model={}, persistent_user_config={}",
        config.dev_mode,
        config.endpoints.copilot_model,
        config.user_config_path.is_some()
    );

    api::serve(config).await?;

    Ok(())
}
