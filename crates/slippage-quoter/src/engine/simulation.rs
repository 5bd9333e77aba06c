//! Router-backed swap simulation.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::Address;
use num_bigint::BigUint;

use crate::oracle::ReserveOracle;
use crate::types::{QuoterError, Result};

/// Run `fut` with a deadline, mapping expiry to `QuoterError::Timeout`.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(QuoterError::Timeout(limit.as_millis() as u64)),
    }
}

/// Input and output legs reported by the router for one simulated sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAmounts {
    pub amount_in: BigUint,
    pub amount_out: BigUint,
}

impl SwapAmounts {
    pub fn new(amount_in: BigUint, amount_out: BigUint) -> Self {
        Self { amount_in, amount_out }
    }
}

/// Quotes a single-hop sell through a router's `getAmountsOut`.
pub struct RouterSimulation<'a> {
    oracle: &'a dyn ReserveOracle,
    router: Address,
    path: [Address; 2],
}

impl<'a> RouterSimulation<'a> {
    pub fn new(oracle: &'a dyn ReserveOracle, router: Address, sell_token: Address, buy_token: Address) -> Self {
        Self { oracle, router, path: [sell_token, buy_token] }
    }

    /// First and last elements of the router's amounts array for selling
    /// `amount_in`.
    pub async fn swap(&self, amount_in: BigUint) -> Result<SwapAmounts> {
        let amounts = self.oracle.get_amounts_out(self.router, &amount_in, self.path).await?;
        match amounts.as_slice() {
            [first, .., last] => Ok(SwapAmounts::new(first.clone(), last.clone())),
            _ => Err(QuoterError::Rpc(format!(
                "getAmountsOut on {} returned {} amounts for a two-token path",
                self.router,
                amounts.len()
            ))),
        }
    }
}
