//! In-memory oracle for exercising the engine without a node.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{address, Address};
use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero;

use slippage_quoter::config::{CacheSettings, ChainRegistry, TimeoutSettings};
use slippage_quoter::engine::simulation::SwapAmounts;
use slippage_quoter::oracle::{PairReserves, ReserveOracle};
use slippage_quoter::types::{QuoterError, Result};
use slippage_quoter::LiquidityEngine;

pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const PAIR: Address = address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc");

pub const WETH_STR: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC_STR: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

pub fn tokens(amount: u64, decimals: u32) -> BigUint {
    BigUint::from(amount) * BigUint::from(10u32).pow(decimals)
}

/// Constant-product output with a fee in basis points, as a V2 router computes it.
pub fn constant_product_out(amount_in: &BigUint, reserve_in: &BigUint, reserve_out: &BigUint, fee_bps: u32) -> BigUint {
    let amount_in_with_fee = amount_in * (10_000u32 - fee_bps);
    let numerator = &amount_in_with_fee * reserve_out;
    let denominator = reserve_in * 10_000u32 + amount_in_with_fee;
    numerator / denominator
}

/// Router amounts for a constant-product sell of `amount_in`.
pub fn constant_product_swap(amount_in: &BigUint, reserve_in: &BigUint, reserve_out: &BigUint, fee_bps: u32) -> SwapAmounts {
    SwapAmounts::new(amount_in.clone(), constant_product_out(amount_in, reserve_in, reserve_out, fee_bps))
}

#[derive(Debug, Clone)]
pub enum RouterBehavior {
    ConstantProduct { fee_bps: u32 },
    /// Returns `[reserve_in, reserve_out]` whatever the input.
    EchoReserves,
    Fail(String),
    /// Constant product with a 0.3% fee, reverting for inputs above `limit`.
    FailAbove { limit: BigUint },
    ZeroOutput,
}

/// Oracle calls that can be made to hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stall {
    Pair,
    Decimals,
    BlockNumber,
}

pub struct MockOracle {
    pair: Address,
    token0: Address,
    token1: Address,
    reserve0: BigUint,
    reserve1: BigUint,
    decimals: HashMap<Address, u64>,
    router: RouterBehavior,
    block: std::result::Result<u64, String>,
    lookup_error: Option<String>,
    stalled: Vec<Stall>,
    calls: AtomicUsize,
    router_calls: AtomicUsize,
}

impl MockOracle {
    /// A single pool with 18-decimal tokens and a 0.3% fee router.
    pub fn pool(token0: Address, token1: Address, reserve0: BigUint, reserve1: BigUint) -> Self {
        Self {
            pair: PAIR,
            token0,
            token1,
            reserve0,
            reserve1,
            decimals: HashMap::new(),
            router: RouterBehavior::ConstantProduct { fee_bps: 30 },
            block: Ok(19_000_000),
            lookup_error: None,
            stalled: Vec::new(),
            calls: AtomicUsize::new(0),
            router_calls: AtomicUsize::new(0),
        }
    }

    /// 500 WETH against 1.5M USDC.
    pub fn weth_usdc() -> Self {
        Self::pool(USDC, WETH, tokens(1_500_000, 6), tokens(500, 18)).with_decimals(USDC, 6)
    }

    pub fn without_pool(mut self) -> Self {
        self.pair = Address::ZERO;
        self
    }

    pub fn with_decimals(mut self, token: Address, decimals: u64) -> Self {
        self.decimals.insert(token, decimals);
        self
    }

    pub fn with_router(mut self, router: RouterBehavior) -> Self {
        self.router = router;
        self
    }

    /// `getPair` fails as if the node were unreachable.
    pub fn with_lookup_error(mut self, message: &str) -> Self {
        self.lookup_error = Some(message.to_string());
        self
    }

    pub fn with_block_error(mut self, message: &str) -> Self {
        self.block = Err(message.to_string());
        self
    }

    /// `call` never answers within any configured timeout.
    pub fn with_stall(mut self, call: Stall) -> Self {
        self.stalled.push(call);
        self
    }

    /// Every oracle call, router simulations included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn router_calls(&self) -> usize {
        self.router_calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn maybe_stall(&self, call: Stall) {
        if self.stalled.contains(&call) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
    }

    fn reserves_for(&self, token_in: Address) -> Result<(BigUint, BigUint)> {
        if token_in == self.token0 {
            Ok((self.reserve0.clone(), self.reserve1.clone()))
        } else if token_in == self.token1 {
            Ok((self.reserve1.clone(), self.reserve0.clone()))
        } else {
            Err(QuoterError::Rpc("execution reverted: UniswapV2Library: INVALID_PATH".to_string()))
        }
    }
}

#[async_trait]
impl ReserveOracle for MockOracle {
    async fn get_pair(&self, _factory: Address, _token_a: Address, _token_b: Address) -> Result<Address> {
        self.record();
        self.maybe_stall(Stall::Pair).await;
        match &self.lookup_error {
            Some(message) => Err(QuoterError::Rpc(message.clone())),
            None => Ok(self.pair),
        }
    }

    async fn get_reserves(&self, _pair: Address) -> Result<PairReserves> {
        self.record();
        Ok(PairReserves {
            reserve0: self.reserve0.clone(),
            reserve1: self.reserve1.clone(),
            block_timestamp_last: 1_700_000_000,
        })
    }

    async fn token0(&self, _pair: Address) -> Result<Address> {
        self.record();
        Ok(self.token0)
    }

    async fn token1(&self, _pair: Address) -> Result<Address> {
        self.record();
        Ok(self.token1)
    }

    async fn decimals(&self, token: Address) -> Result<u64> {
        self.record();
        self.maybe_stall(Stall::Decimals).await;
        Ok(self.decimals.get(&token).copied().unwrap_or(18))
    }

    async fn get_amounts_out(&self, _router: Address, amount_in: &BigUint, path: [Address; 2]) -> Result<Vec<BigUint>> {
        self.record();
        self.router_calls.fetch_add(1, Ordering::SeqCst);
        let (reserve_in, reserve_out) = self.reserves_for(path[0])?;
        match &self.router {
            RouterBehavior::ConstantProduct { fee_bps } => {
                let out = constant_product_out(amount_in, &reserve_in, &reserve_out, *fee_bps);
                Ok(vec![amount_in.clone(), out])
            }
            RouterBehavior::EchoReserves => Ok(vec![reserve_in, reserve_out]),
            RouterBehavior::Fail(message) => Err(QuoterError::Rpc(message.clone())),
            RouterBehavior::FailAbove { limit } if amount_in > limit => {
                Err(QuoterError::Rpc("execution reverted".to_string()))
            }
            RouterBehavior::FailAbove { .. } => {
                let out = constant_product_out(amount_in, &reserve_in, &reserve_out, 30);
                Ok(vec![amount_in.clone(), out])
            }
            RouterBehavior::ZeroOutput => Ok(vec![amount_in.clone(), BigUint::zero()]),
        }
    }

    async fn block_number(&self) -> Result<u64> {
        self.record();
        self.maybe_stall(Stall::BlockNumber).await;
        self.block.clone().map_err(QuoterError::Rpc)
    }
}

/// Engine over the built-in chain registry with every chain served by `oracle`.
pub fn engine_with(oracle: Arc<MockOracle>) -> LiquidityEngine {
    engine_with_cache(oracle, CacheSettings::default())
}

pub fn engine_with_cache(oracle: Arc<MockOracle>, cache: CacheSettings) -> LiquidityEngine {
    let chains = ChainRegistry::with_defaults();
    let oracles: HashMap<u64, Arc<dyn ReserveOracle>> = chains
        .supported_ids()
        .into_iter()
        .map(|id| (id, oracle.clone() as Arc<dyn ReserveOracle>))
        .collect();
    LiquidityEngine::new(chains, oracles, cache, TimeoutSettings::default())
}
