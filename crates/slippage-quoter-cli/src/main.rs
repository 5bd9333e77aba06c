mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use slippage_quoter::config::AppConfig;
use slippage_quoter::types::LiquidityRequest;
use slippage_quoter::LiquidityEngine;
use tracing_subscriber::EnvFilter;

use cli::{render_table, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli.config.clone())?;

    // Quiet by default so table/JSON output stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let engine = LiquidityEngine::from_config(&config).context("failed to build liquidity engine")?;
    let request = LiquidityRequest {
        sell_token: cli.sell_token.clone(),
        buy_token: cli.buy_token.clone(),
        chain_id: cli.chain_id,
    };

    let response = engine
        .get_liquidity_quotes(&request)
        .await
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_table(&response));
    }
    Ok(())
}
