//! Pool sanity checks run before any search is attempted.

use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::oracle::PairReserves;
use crate::types::{QuoterError, Result, TokenReserves};
use crate::utils::units::milli_unit;

/// Uniswap V2 locks this many LP units at pool creation; reserves at or
/// below it mean the pool was never meaningfully funded.
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Largest decimals value for which `10^decimals` fits in a uint256.
pub const MAX_DECIMALS: u64 = 77;

/// Orient raw pool reserves so the sell token's side comes first.
pub fn order_reserves(raw: &PairReserves, token0: Address, token1: Address, sell_token: Address) -> Result<TokenReserves> {
    let (reserve_sell, reserve_buy) = if sell_token == token0 {
        (raw.reserve0.clone(), raw.reserve1.clone())
    } else if sell_token == token1 {
        (raw.reserve1.clone(), raw.reserve0.clone())
    } else {
        return Err(QuoterError::Internal(format!(
            "pool tokens {} / {} do not include sell token {}",
            token0, token1, sell_token
        )));
    };
    Ok(TokenReserves { reserve_sell, reserve_buy, token0, token1 })
}

/// Reject decimals that cannot come from a real ERC20 token.
pub fn validate_decimals(token: Address, decimals: u64) -> Result<u8> {
    if decimals > MAX_DECIMALS {
        return Err(QuoterError::InvalidDecimals { token, decimals });
    }
    Ok(decimals as u8)
}

/// Per-side reserve floor: 0.001 token, but never below `MINIMUM_LIQUIDITY` raw units.
pub fn reserve_floor(decimals: u8) -> BigUint {
    milli_unit(decimals).max(BigUint::from(MINIMUM_LIQUIDITY))
}

/// Both sides must clear their floor, and a trade of 0.1% of the sell reserve
/// must still be more than ten floors deep.
pub fn check_liquidity(reserves: &TokenReserves, sell_decimals: u8, buy_decimals: u8) -> Result<()> {
    if reserves.reserve_sell.is_zero() || reserves.reserve_buy.is_zero() {
        return Err(QuoterError::ZeroReserves);
    }

    let sell_floor = reserve_floor(sell_decimals);
    if reserves.reserve_sell <= sell_floor || reserves.reserve_buy <= reserve_floor(buy_decimals) {
        return Err(QuoterError::InsufficientLiquidity);
    }

    let probe = &reserves.reserve_sell / 1000u32;
    if probe <= sell_floor * 10u32 {
        return Err(QuoterError::ShallowPool);
    }
    Ok(())
}
