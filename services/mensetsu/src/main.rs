use anyhow::{Context, Result};
use clap::Parser;
use mensetsu_service::backend::factory_from_config;
use mensetsu_service::config::Config;
use mensetsu_service::server::{AppState, router};
use mensetsu_service::store::LoggingStore;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "mensetsu", about = "Realtime AI mock-interview service")]
struct Cli {
    /// Listen address override, e.g. 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    let args = Cli::parse();
    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());

    let factory =
        factory_from_config(&config).context("Failed to build agent connection factory")?;
    let state = AppState {
        factory,
        store: Arc::new(LoggingStore),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received Ctrl-C, shutting down...");
        })
        .await?;

    Ok(())
}
