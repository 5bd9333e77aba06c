//! Read-only chain access: pool lookup, reserve snapshot, token decimals and
//! router pricing simulation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Uint, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use num_bigint::BigUint;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::bindings::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02, IERC20};
use crate::types::{QuoterError, Result};

/// Raw `getReserves()` result, in pool order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve0: BigUint,
    pub reserve1: BigUint,
    pub block_timestamp_last: u32,
}

/// The narrow RPC contract the engine depends on.
#[async_trait]
pub trait ReserveOracle: Send + Sync {
    /// Pool address for the pair; `Address::ZERO` means there is none.
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address>;
    async fn get_reserves(&self, pair: Address) -> Result<PairReserves>;
    async fn token0(&self, pair: Address) -> Result<Address>;
    async fn token1(&self, pair: Address) -> Result<Address>;
    /// Reported decimals, unvalidated; values above `u8::MAX` are passed through.
    async fn decimals(&self, token: Address) -> Result<u64>;
    async fn get_amounts_out(&self, router: Address, amount_in: &BigUint, path: [Address; 2]) -> Result<Vec<BigUint>>;
    async fn block_number(&self) -> Result<u64>;
}

pub(crate) fn uint_to_biguint<const BITS: usize, const LIMBS: usize>(value: &Uint<BITS, LIMBS>) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes_vec())
}

pub(crate) fn biguint_to_u256(value: &BigUint) -> Result<U256> {
    U256::try_from_be_slice(&value.to_bytes_be())
        .ok_or_else(|| QuoterError::Internal(format!("amount {} does not fit in uint256", value)))
}

/// JSON-RPC implementation over HTTP.
pub struct RpcReserveOracle {
    client: Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl RpcReserveOracle {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoterError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, rpc_url: rpc_url.into(), next_id: AtomicU64::new(1) })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| QuoterError::Rpc(format!("{} request failed: {}", method, e)))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| QuoterError::Rpc(format!("{} returned an unreadable response: {}", method, e)))?;

        if let Some(err) = body.get("error") {
            let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(QuoterError::Rpc(format!("{} failed: {}", method, message)));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| QuoterError::Rpc(format!("{} returned no result", method)))
    }

    async fn eth_call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return> {
        let data = format!("0x{}", hex::encode(call.abi_encode()));
        let result = self
            .request("eth_call", json!([{ "to": to.to_string(), "data": data }, "latest"]))
            .await?;
        let encoded = result
            .as_str()
            .ok_or_else(|| QuoterError::Rpc(format!("{} on {}: non-string result", C::SIGNATURE, to)))?;
        let bytes = hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| QuoterError::Rpc(format!("{} on {}: bad hex: {}", C::SIGNATURE, to, e)))?;
        if bytes.is_empty() {
            // No code at `to`, or a call the contract does not implement.
            return Err(QuoterError::Rpc(format!("{} on {}: empty return data", C::SIGNATURE, to)));
        }
        C::abi_decode_returns(&bytes, true)
            .map_err(|e| QuoterError::Rpc(format!("{} on {}: decode failed: {}", C::SIGNATURE, to, e)))
    }
}

#[async_trait]
impl ReserveOracle for RpcReserveOracle {
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
        let call = IUniswapV2Factory::getPairCall { tokenA: token_a, tokenB: token_b };
        Ok(self.eth_call(factory, &call).await?.pair)
    }

    async fn get_reserves(&self, pair: Address) -> Result<PairReserves> {
        let ret = self.eth_call(pair, &IUniswapV2Pair::getReservesCall {}).await?;
        Ok(PairReserves {
            reserve0: uint_to_biguint(&ret.reserve0),
            reserve1: uint_to_biguint(&ret.reserve1),
            block_timestamp_last: ret.blockTimestampLast,
        })
    }

    async fn token0(&self, pair: Address) -> Result<Address> {
        Ok(self.eth_call(pair, &IUniswapV2Pair::token0Call {}).await?._0)
    }

    async fn token1(&self, pair: Address) -> Result<Address> {
        Ok(self.eth_call(pair, &IUniswapV2Pair::token1Call {}).await?._0)
    }

    async fn decimals(&self, token: Address) -> Result<u64> {
        let raw = self.eth_call(token, &IERC20::decimalsCall {}).await?._0;
        Ok(u64::try_from(raw).unwrap_or(u64::MAX))
    }

    async fn get_amounts_out(&self, router: Address, amount_in: &BigUint, path: [Address; 2]) -> Result<Vec<BigUint>> {
        let call = IUniswapV2Router02::getAmountsOutCall {
            amountIn: biguint_to_u256(amount_in)?,
            path: path.to_vec(),
        };
        let ret = self.eth_call(router, &call).await?;
        debug!(%router, amount_in = %amount_in, "getAmountsOut returned {} amounts", ret.amounts.len());
        Ok(ret.amounts.iter().map(uint_to_biguint).collect())
    }

    async fn block_number(&self) -> Result<u64> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| QuoterError::Rpc("eth_blockNumber: non-string result".to_string()))?;
        u64::from_str_radix(hex_str.trim_start_matches("0x"), 16)
            .map_err(|e| QuoterError::Rpc(format!("eth_blockNumber: bad block number {}: {}", hex_str, e)))
    }
}
