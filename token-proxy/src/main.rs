use std::sync::Arc;

use bridge_desktop::ReqwestHttpClient;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use token_proxy::{serve, AppState, ProxyConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut logging = LoggingConfig::default();
    if let Ok(format) = std::env::var("TOKEN_PROXY_LOG_FORMAT") {
        logging = logging.with_format(format.parse::<LogFormat>()?);
    }
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logging = logging.with_filter(filter);
    }
    init_logging(logging)?;

    let config = ProxyConfig::from_env()?;
    if config.credentials().is_none() {
        warn!("SPOTIFY_CLIENT_ID or SPOTIFY_CLIENT_SECRET is unset; token requests will fail");
    }
    info!(?config, "Starting token proxy");

    let http = Arc::new(ReqwestHttpClient::try_new()?);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    serve(listener, AppState::new(config, http), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
