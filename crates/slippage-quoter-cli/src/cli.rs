//! CLI arguments and output formatting.

use std::str::FromStr;

use clap::Parser;
use rust_decimal::Decimal;
use slippage_quoter::config::CliConfig;
use slippage_quoter::types::{LiquidityResponse, SlippageLevel, SlippageQuote};

/// Trade sizes at 1%, 5% and 10% price impact for one token pair.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long)]
    pub sell_token: String,
    #[arg(long)]
    pub buy_token: String,
    #[arg(long, default_value_t = 1)]
    pub chain_id: u64,
    /// Print the raw JSON response instead of a table
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub config: CliConfig,
}

/// Buy tokens received per sell token.
pub fn effective_price(quote: &SlippageQuote) -> Option<Decimal> {
    let sell = Decimal::from_str(&quote.sell_amount).ok()?;
    let buy = Decimal::from_str(&quote.buy_amount).ok()?;
    buy.checked_div(sell)
}

pub fn render_table(response: &LiquidityResponse) -> String {
    let mut out = String::new();
    out.push_str(&format!("Chain {}: {} -> {}\n", response.chain_id, response.sell_token, response.buy_token));
    out.push_str(&format!("{:<8}{:>32}{:>32}{:>20}\n", "Impact", "Sell", "Buy", "Price"));
    for level in SlippageLevel::ALL {
        let quote = response.quotes.get(level);
        let price = effective_price(quote)
            .map(|p| p.round_dp(6).normalize().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!("{:<8}{:>32}{:>32}{:>20}\n", level.label(), quote.sell_amount, quote.buy_amount, price));
    }
    out
}
