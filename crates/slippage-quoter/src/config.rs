//! Configuration loading, env vars, CLI flags and the chain registry.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use alloy_primitives::{address, Address};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::{info, warn};

use crate::utils::address::normalize_address;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SIMULATION_TIMEOUT_MS: u64 = 10_000;

/// Everything the core needs to talk to one chain's constant-product exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    /// Prefix of the `<KEY>_RPC_URL` override variable.
    pub env_key: String,
    pub rpc_url: String,
    pub factory_address: Address,
    pub router_address: Address,
}

/// Immutable-after-startup map from chain id to chain config.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainConfig>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in chains, each pointing at its canonical Uniswap V2 style deployment.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(ChainConfig {
            chain_id: 1,
            name: "Ethereum".to_string(),
            env_key: "ETHEREUM".to_string(),
            rpc_url: "https://eth.llamarpc.com".to_string(),
            factory_address: address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
            router_address: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
        });
        registry.insert(ChainConfig {
            chain_id: 56,
            name: "BNB Smart Chain".to_string(),
            env_key: "BSC".to_string(),
            rpc_url: "https://bsc-dataseed.binance.org".to_string(),
            factory_address: address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
            router_address: address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
        });
        registry.insert(ChainConfig {
            chain_id: 137,
            name: "Polygon".to_string(),
            env_key: "POLYGON".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            factory_address: address!("5757371414417b8C6CAad45bAeF941aBc7d3Ab32"),
            router_address: address!("a5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff"),
        });
        registry.insert(ChainConfig {
            chain_id: 8453,
            name: "Base".to_string(),
            env_key: "BASE".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
            factory_address: address!("8909Dc15e40173Ff4699343b6eB8132c65e18eC6"),
            router_address: address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24"),
        });
        registry.insert(ChainConfig {
            chain_id: 42161,
            name: "Arbitrum One".to_string(),
            env_key: "ARBITRUM".to_string(),
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            factory_address: address!("c35DADB65012eC5796536bD9864eD8773aBc74C4"),
            router_address: address!("1b02dA8Cb0d097eB8D57A175b88c7D8b47997506"),
        });
        registry
    }

    /// Adds a chain, replacing any existing entry with the same id.
    pub fn insert(&mut self, chain: ChainConfig) {
        self.chains.insert(chain.chain_id, chain);
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    /// Registered chain ids in ascending order.
    pub fn supported_ids(&self) -> Vec<u64> {
        self.chains.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Replace RPC urls from `<KEY>_RPC_URL` variables found through `lookup`.
    pub fn apply_rpc_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for chain in self.chains.values_mut() {
            let var = format!("{}_RPC_URL", chain.env_key);
            if let Some(url) = lookup(&var).filter(|u| !u.trim().is_empty()) {
                info!(chain = %chain.name, "Using RPC override from {}", var);
                chain.rpc_url = url;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Two-tier RPC timeouts: a short one for connectivity probes and a longer
/// one for every call made while quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSettings {
    pub rpc: Duration,
    pub simulation: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            rpc: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            simulation: Duration::from_millis(DEFAULT_SIMULATION_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cache: CacheSettings,
    pub timeouts: TimeoutSettings,
    pub chains: ChainRegistry,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub env_key: Option<String>,
    pub rpc_url: String,
    pub factory_address: String,
    pub router_address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub rpc_timeout_ms: Option<u64>,
    pub simulation_timeout_ms: Option<u64>,
    #[serde(default)]
    pub chains: Vec<FileChainConfig>,
}

impl FileConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.as_ref().display()))?;
        toml::from_str(&text)
            .map_err(|e| anyhow!("config file {} is not valid TOML: {}", path.as_ref().display(), e))
    }
}

/// Command-line overrides. Also usable without the `cli` feature as a plain
/// struct of optional values.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(author, version, about, long_about = None))]
pub struct CliConfig {
    /// Path to a TOML config file
    #[cfg_attr(feature = "cli", arg(long))]
    pub config: Option<String>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub host: Option<String>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub port: Option<u16>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_level: Option<String>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub cache_ttl_secs: Option<u64>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub cache_capacity: Option<usize>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub rpc_timeout_ms: Option<u64>,
    #[cfg_attr(feature = "cli", arg(long))]
    pub simulation_timeout_ms: Option<u64>,
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl AppConfig {
    /// Environment variables over built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_sources(CliConfig::default(), FileConfig::default(), env_lookup)
    }

    /// CLI flags > config file > environment > defaults.
    #[cfg(feature = "cli")]
    pub fn load_with_cli() -> anyhow::Result<Self> {
        Self::from_cli(CliConfig::parse())
    }

    /// Same layering as `load_with_cli` for flags parsed elsewhere.
    pub fn from_cli(cli: CliConfig) -> anyhow::Result<Self> {
        let file = match cli.config.as_deref() {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(cli, file, env_lookup)
    }

    pub fn from_sources<F>(cli: CliConfig, file: FileConfig, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| env(key).and_then(|s| s.trim().parse::<u64>().ok());

        let host = cli.host
            .or(file.host)
            .or_else(|| env("HOST"))
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = cli.port
            .or(file.port)
            .or_else(|| env("PORT").and_then(|s| s.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT);
        let log_level = cli.log_level
            .or(file.log_level)
            .or_else(|| env("LOG_LEVEL"))
            .unwrap_or_else(|| "info".to_string());

        let cache_ttl = cli.cache_ttl_secs
            .or(file.cache_ttl_secs)
            .or_else(|| parsed("CACHE_TTL_SECS"))
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let cache_capacity = cli.cache_capacity
            .or(file.cache_capacity)
            .or_else(|| env("CACHE_CAPACITY").and_then(|s| s.trim().parse().ok()))
            .unwrap_or(DEFAULT_CACHE_CAPACITY);
        if cache_capacity == 0 {
            anyhow::bail!("cache capacity must be at least 1");
        }

        let rpc_timeout = cli.rpc_timeout_ms
            .or(file.rpc_timeout_ms)
            .or_else(|| parsed("RPC_TIMEOUT_MS"))
            .unwrap_or(DEFAULT_RPC_TIMEOUT_MS);
        let simulation_timeout = cli.simulation_timeout_ms
            .or(file.simulation_timeout_ms)
            .or_else(|| parsed("SIMULATION_TIMEOUT_MS"))
            .unwrap_or(DEFAULT_SIMULATION_TIMEOUT_MS);

        let mut chains = ChainRegistry::with_defaults();
        for entry in file.chains {
            let chain_id = entry.chain_id;
            let factory_address = normalize_address(&entry.factory_address)
                .map_err(|e| anyhow!("chain {}: factory address: {}", chain_id, e))?;
            let router_address = normalize_address(&entry.router_address)
                .map_err(|e| anyhow!("chain {}: router address: {}", chain_id, e))?;
            let env_key = entry
                .env_key
                .unwrap_or_else(|| entry.name.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
            chains.insert(ChainConfig {
                chain_id,
                name: entry.name,
                env_key,
                rpc_url: entry.rpc_url,
                factory_address,
                router_address,
            });
        }
        chains.apply_rpc_overrides(&env);
        if chains.is_empty() {
            warn!("No chains configured; every liquidity request will be rejected.");
        }

        Ok(Self {
            host,
            port,
            log_level,
            cache: CacheSettings {
                capacity: cache_capacity,
                ttl: Duration::from_secs(cache_ttl),
            },
            timeouts: TimeoutSettings {
                rpc: Duration::from_millis(rpc_timeout),
                simulation: Duration::from_millis(simulation_timeout),
            },
            chains,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
