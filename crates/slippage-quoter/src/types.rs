//! Common types, error handling and data models.

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, set where the failure happens.
///
/// The HTTP layer maps these straight to status codes: validation and domain
/// failures are the caller's to fix, network failures are transient, anything
/// else is ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Domain,
    Network,
    Internal,
}

/// Common error type for the slippage-quoter system.
#[derive(Debug, Clone, Error)]
pub enum QuoterError {
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),
    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("Invalid token address: {0}")]
    InvalidAddress(String),
    #[error("Sell and buy tokens must be different")]
    IdenticalTokens,
    #[error("Unsupported chain id {chain_id}. Supported chains: {}", join_ids(.supported))]
    UnsupportedChain { chain_id: u64, supported: Vec<u64> },
    #[error("No liquidity pool found for token pair")]
    NoPool,
    #[error("Pool has zero reserves")]
    ZeroReserves,
    #[error("Insufficient liquidity in pool")]
    InsufficientLiquidity,
    #[error("Pool is too shallow to price reliably")]
    ShallowPool,
    #[error("Invalid token decimals {decimals} for {token}: not a valid ERC20 contract")]
    InvalidDecimals { token: Address, decimals: u64 },
    #[error("Could not find a quote for {}% slippage", format_target(.0))]
    NoQuoteFound(f64),
    #[error("Failed to calculate slippage for: {0}")]
    SlippageLevelsFailed(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("RPC call timed out after {0} ms")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

fn format_target(fraction: &f64) -> String {
    format!("{}", fraction * 100.0)
}

impl QuoterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuoterError::MissingParameters(_)
            | QuoterError::InvalidChainId(_)
            | QuoterError::InvalidAddress(_)
            | QuoterError::IdenticalTokens
            | QuoterError::UnsupportedChain { .. } => ErrorKind::Validation,
            QuoterError::NoPool
            | QuoterError::ZeroReserves
            | QuoterError::InsufficientLiquidity
            | QuoterError::ShallowPool
            | QuoterError::InvalidDecimals { .. }
            | QuoterError::NoQuoteFound(_)
            | QuoterError::SlippageLevelsFailed(_) => ErrorKind::Domain,
            QuoterError::Rpc(_) | QuoterError::Timeout(_) => ErrorKind::Network,
            QuoterError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            QuoterError::MissingParameters(_) => "MissingParameters",
            QuoterError::InvalidChainId(_) => "InvalidChainId",
            QuoterError::UnsupportedChain { .. } => "UnsupportedChain",
            QuoterError::InvalidAddress(_) | QuoterError::IdenticalTokens => "InvalidTokenPair",
            QuoterError::NoPool => "NoPool",
            QuoterError::ZeroReserves => "ZeroReserves",
            QuoterError::InsufficientLiquidity => "InsufficientLiquidity",
            QuoterError::ShallowPool => "ShallowPool",
            QuoterError::InvalidDecimals { .. } => "InvalidToken",
            QuoterError::NoQuoteFound(_) | QuoterError::SlippageLevelsFailed(_) => "NoQuoteFound",
            QuoterError::Rpc(_) | QuoterError::Timeout(_) => "ServiceUnavailable",
            QuoterError::Internal(_) => "InternalServerError",
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoterError>;

/// One request for liquidity depth, as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRequest {
    pub sell_token: String,
    pub buy_token: String,
    pub chain_id: u64,
}

/// Pool reserves, already ordered by the requested trade direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReserves {
    pub reserve_sell: BigUint,
    pub reserve_buy: BigUint,
    pub token0: Address,
    pub token1: Address,
}

/// Trade size and resulting output, both scaled to human-readable units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlippageQuote {
    pub sell_amount: String,
    pub buy_amount: String,
}

/// The three price-impact targets every request is answered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlippageLevel {
    OnePercent,
    FivePercent,
    TenPercent,
}

impl SlippageLevel {
    pub const ALL: [SlippageLevel; 3] = [
        SlippageLevel::OnePercent,
        SlippageLevel::FivePercent,
        SlippageLevel::TenPercent,
    ];

    /// Target impact as a fraction, e.g. 0.05 for 5%.
    pub fn fraction(self) -> f64 {
        match self {
            SlippageLevel::OnePercent => 0.01,
            SlippageLevel::FivePercent => 0.05,
            SlippageLevel::TenPercent => 0.10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SlippageLevel::OnePercent => "1%",
            SlippageLevel::FivePercent => "5%",
            SlippageLevel::TenPercent => "10%",
        }
    }
}

impl fmt::Display for SlippageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quotes for all three levels. Serialized as `{"1%": .., "5%": .., "10%": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageQuotes {
    #[serde(rename = "1%")]
    pub one_percent: SlippageQuote,
    #[serde(rename = "5%")]
    pub five_percent: SlippageQuote,
    #[serde(rename = "10%")]
    pub ten_percent: SlippageQuote,
}

impl SlippageQuotes {
    pub fn get(&self, level: SlippageLevel) -> &SlippageQuote {
        match level {
            SlippageLevel::OnePercent => &self.one_percent,
            SlippageLevel::FivePercent => &self.five_percent,
            SlippageLevel::TenPercent => &self.ten_percent,
        }
    }

    /// Builds the full set, or `None` if any level is missing.
    pub fn from_levels(mut levels: BTreeMap<SlippageLevel, SlippageQuote>) -> Option<Self> {
        Some(Self {
            one_percent: levels.remove(&SlippageLevel::OnePercent)?,
            five_percent: levels.remove(&SlippageLevel::FivePercent)?,
            ten_percent: levels.remove(&SlippageLevel::TenPercent)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityResponse {
    pub sell_token: String,
    pub buy_token: String,
    pub chain_id: u64,
    pub quotes: SlippageQuotes,
}
