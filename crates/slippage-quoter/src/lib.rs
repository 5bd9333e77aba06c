// Library entry point for slippage-quoter

pub mod bindings;
pub mod cache;
pub mod config;
pub mod engine;
pub mod oracle;
pub mod types;
pub mod utils;

#[cfg(feature = "api")]
pub mod api;

pub use engine::LiquidityEngine;
pub use types::{QuoterError, Result};
