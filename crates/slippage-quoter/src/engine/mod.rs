pub mod liquidity;
pub mod search;
pub mod simulation;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::Address;
use futures::future::join_all;
use num_traits::Zero;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{QuoteCache, QuoteCacheKey};
use crate::config::{AppConfig, CacheSettings, ChainConfig, ChainRegistry, TimeoutSettings};
use crate::oracle::{ReserveOracle, RpcReserveOracle};
use crate::types::{
    LiquidityRequest, LiquidityResponse, QuoterError, Result, SlippageLevel, SlippageQuote, SlippageQuotes,
    TokenReserves,
};
use crate::utils::address::{normalize_address, to_checksum};
use liquidity::{check_liquidity, order_reserves, validate_decimals};
use search::{find_quote_for_target_impact, SearchSettings};
use simulation::{with_deadline, RouterSimulation};

/// Outcome of an RPC connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub latest_block: Option<u64>,
    pub error: Option<String>,
    pub cache_size: usize,
}

/// Coordinates one liquidity request end to end: validation, pool state,
/// the three slippage searches and the shared quote cache.
pub struct LiquidityEngine {
    chains: ChainRegistry,
    oracles: HashMap<u64, Arc<dyn ReserveOracle>>,
    cache: Mutex<QuoteCache>,
    timeouts: TimeoutSettings,
}

impl LiquidityEngine {
    pub fn new(
        chains: ChainRegistry,
        oracles: HashMap<u64, Arc<dyn ReserveOracle>>,
        cache: CacheSettings,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self {
            chains,
            oracles,
            cache: Mutex::new(QuoteCache::from_settings(&cache)),
            timeouts,
        }
    }

    /// One JSON-RPC oracle per registered chain.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut oracles: HashMap<u64, Arc<dyn ReserveOracle>> = HashMap::new();
        for chain in config.chains.iter() {
            let oracle = RpcReserveOracle::new(chain.rpc_url.clone(), config.timeouts.simulation)?;
            info!("Registered chain {} ({}) via {}", chain.chain_id, chain.name, chain.rpc_url);
            oracles.insert(chain.chain_id, Arc::new(oracle));
        }
        Ok(Self::new(config.chains.clone(), oracles, config.cache, config.timeouts))
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    fn cache(&self) -> MutexGuard<'_, QuoteCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache_size(&self) -> usize {
        self.cache().size()
    }

    fn oracle_for(&self, chain_id: u64) -> Result<&Arc<dyn ReserveOracle>> {
        self.oracles
            .get(&chain_id)
            .ok_or_else(|| QuoterError::Internal(format!("no RPC client configured for chain {}", chain_id)))
    }

    /// Quotes at 1%, 5% and 10% price impact for selling `sell_token` into `buy_token`.
    ///
    /// Completed responses are cached per (sell, buy, chain). Two identical
    /// requests racing past an empty cache will both do the upstream work.
    pub async fn get_liquidity_quotes(&self, request: &LiquidityRequest) -> Result<LiquidityResponse> {
        let sell_token = normalize_address(&request.sell_token)?;
        let buy_token = normalize_address(&request.buy_token)?;
        if sell_token == buy_token {
            return Err(QuoterError::IdenticalTokens);
        }

        let chain = self.chains.get(request.chain_id).ok_or_else(|| QuoterError::UnsupportedChain {
            chain_id: request.chain_id,
            supported: self.chains.supported_ids(),
        })?;

        let key = QuoteCacheKey { sell_token, buy_token, chain_id: chain.chain_id };
        let cached = self.cache().get(&key).cloned();
        if let Some(cached) = cached {
            debug!("Cache hit for {} -> {} on chain {}", sell_token, buy_token, chain.chain_id);
            return Ok(cached);
        }

        info!("Quoting {} -> {} on {} ({})", sell_token, buy_token, chain.name, chain.chain_id);
        let oracle = self.oracle_for(chain.chain_id)?;

        let reserves = self.fetch_reserves(oracle.as_ref(), chain, sell_token, buy_token).await?;
        let (sell_decimals, buy_decimals) = self.fetch_decimals(oracle.as_ref(), sell_token, buy_token).await?;
        check_liquidity(&reserves, sell_decimals, buy_decimals)?;

        let quotes = self
            .quote_all_levels(oracle.as_ref(), chain, &reserves, sell_token, buy_token, sell_decimals, buy_decimals)
            .await?;

        let response = LiquidityResponse {
            sell_token: to_checksum(&sell_token),
            buy_token: to_checksum(&buy_token),
            chain_id: chain.chain_id,
            quotes,
        };
        self.cache().set(key, response.clone());
        Ok(response)
    }

    /// Locate the pool and read its reserves, oriented by trade direction.
    pub async fn fetch_reserves(
        &self,
        oracle: &dyn ReserveOracle,
        chain: &ChainConfig,
        sell_token: Address,
        buy_token: Address,
    ) -> Result<TokenReserves> {
        let limit = self.timeouts.simulation;
        let pair = with_deadline(limit, oracle.get_pair(chain.factory_address, sell_token, buy_token)).await?;
        if pair == Address::ZERO {
            return Err(QuoterError::NoPool);
        }
        debug!(%pair, "Found pool");

        let (raw, token0, token1) = tokio::join!(
            with_deadline(limit, oracle.get_reserves(pair)),
            with_deadline(limit, oracle.token0(pair)),
            with_deadline(limit, oracle.token1(pair)),
        );
        let raw = raw?;
        if raw.reserve0.is_zero() || raw.reserve1.is_zero() {
            return Err(QuoterError::ZeroReserves);
        }
        order_reserves(&raw, token0?, token1?, sell_token)
    }

    /// Both tokens' decimals, fetched concurrently and validated.
    pub async fn fetch_decimals(&self, oracle: &dyn ReserveOracle, sell_token: Address, buy_token: Address) -> Result<(u8, u8)> {
        let limit = self.timeouts.simulation;
        let (sell, buy) = tokio::join!(
            with_deadline(limit, oracle.decimals(sell_token)),
            with_deadline(limit, oracle.decimals(buy_token)),
        );
        Ok((validate_decimals(sell_token, sell?)?, validate_decimals(buy_token, buy?)?))
    }

    /// Run the three searches together and wait for all of them; any failure
    /// fails the whole set with every failed level listed.
    #[allow(clippy::too_many_arguments)]
    async fn quote_all_levels(
        &self,
        oracle: &dyn ReserveOracle,
        chain: &ChainConfig,
        reserves: &TokenReserves,
        sell_token: Address,
        buy_token: Address,
        sell_decimals: u8,
        buy_decimals: u8,
    ) -> Result<SlippageQuotes> {
        let sim = RouterSimulation::new(oracle, chain.router_address, sell_token, buy_token);
        let settings = SearchSettings { call_timeout: self.timeouts.simulation, ..SearchSettings::default() };

        let searches = SlippageLevel::ALL.iter().map(|&level| {
            let sim = &sim;
            let settings = &settings;
            async move {
                let result = find_quote_for_target_impact(
                    &reserves.reserve_sell,
                    &reserves.reserve_buy,
                    sell_decimals,
                    buy_decimals,
                    level.fraction(),
                    settings,
                    move |amount_in| sim.swap(amount_in),
                )
                .await;
                (level, result)
            }
        });
        let outcomes = join_all(searches).await;

        let mut quotes: BTreeMap<SlippageLevel, SlippageQuote> = BTreeMap::new();
        let mut failures = Vec::new();
        for (level, outcome) in outcomes {
            match outcome {
                Ok(quote) => {
                    debug!("{} level: sell {} for {}", level, quote.sell_amount, quote.buy_amount);
                    quotes.insert(level, quote);
                }
                Err(e) => failures.push(format!("{}: {}", level, e)),
            }
        }

        if !failures.is_empty() {
            let combined = failures.join(", ");
            warn!("Slippage search failed on chain {}: {}", chain.chain_id, combined);
            return Err(QuoterError::SlippageLevelsFailed(combined));
        }
        SlippageQuotes::from_levels(quotes)
            .ok_or_else(|| QuoterError::Internal("slippage level missing from results".to_string()))
    }

    /// Chain whose RPC endpoint backs the health probe: Ethereum when
    /// registered, otherwise the lowest id.
    fn probe_chain(&self) -> Option<u64> {
        let ids = self.chains.supported_ids();
        if ids.contains(&1) {
            Some(1)
        } else {
            ids.first().copied()
        }
    }

    /// Probe RPC connectivity with the short timeout.
    pub async fn health(&self) -> HealthReport {
        let cache_size = self.cache_size();
        let probe = match self.probe_chain() {
            Some(chain_id) => match self.oracle_for(chain_id) {
                Ok(oracle) => with_deadline(self.timeouts.rpc, oracle.block_number()).await,
                Err(e) => Err(e),
            },
            None => Err(QuoterError::Internal("no chains configured".to_string())),
        };

        match probe {
            Ok(block) => HealthReport { healthy: true, latest_block: Some(block), error: None, cache_size },
            Err(e) => {
                warn!("Health check failed: {}", e);
                HealthReport { healthy: false, latest_block: None, error: Some(e.to_string()), cache_size }
            }
        }
    }
}
