use std::sync::Arc;

use anyhow::Context;
use slippage_quoter::{api::ApiServer, config::AppConfig, LiquidityEngine};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // CLI flags > config file > env vars > defaults
    let config = AppConfig::load_with_cli()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Loaded config: {} chain(s) {:?}, cache ttl {:?} capacity {}",
        config.chains.supported_ids().len(),
        config.chains.supported_ids(),
        config.cache.ttl,
        config.cache.capacity
    );

    let engine = LiquidityEngine::from_config(&config).context("failed to build liquidity engine")?;
    let server = ApiServer::new(Arc::new(engine));

    server
        .start(&config.bind_address(), async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for ctrl+c: {}", e);
            }
            info!("Shutting down");
        })
        .await
}
