//! Binary search for the trade size that produces a target price impact.
//!
//! Impact is measured against the zero-size spot price `reserve_buy / reserve_sell`
//! using integer fixed-point math (18 fractional digits). Assumes impact is
//! non-decreasing in trade size, which holds for constant-product pools. The
//! loop is capped at `MAX_ITERATIONS` oracle probes.

use std::future::Future;
use std::time::Duration;

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};
use tracing::debug;

use crate::config::DEFAULT_SIMULATION_TIMEOUT_MS;
use crate::engine::simulation::{with_deadline, SwapAmounts};
use crate::types::{QuoterError, Result, SlippageQuote};
use crate::utils::units::{format_units, milli_unit, ratio_scaled};

pub const MAX_ITERATIONS: usize = 15;
pub const TOLERANCE_BP: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_iterations: usize,
    pub tolerance_bp: i64,
    /// Bound on each `quote` call; an elapsed call counts as "too large".
    pub call_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance_bp: TOLERANCE_BP,
            call_timeout: Duration::from_millis(DEFAULT_SIMULATION_TIMEOUT_MS),
        }
    }
}

/// One evaluated trade size. `amount_in` is the probed size the impact is
/// measured at; `swap` holds the amounts the router reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactCandidate {
    pub amount_in: BigUint,
    pub swap: SwapAmounts,
    pub impact_bp: BigInt,
    pub within_tolerance: bool,
}

impl ImpactCandidate {
    pub fn to_quote(&self, sell_decimals: u8, buy_decimals: u8) -> SlippageQuote {
        SlippageQuote {
            sell_amount: format_units(&self.swap.amount_in, sell_decimals),
            buy_amount: format_units(&self.swap.amount_out, buy_decimals),
        }
    }
}

/// Price impact in basis points of selling `amount_in` for `amount_out`,
/// relative to `spot_scaled` (buy per sell, scaled by 10^18). Negative when the
/// trade executes above spot.
pub fn price_impact_bp(spot_scaled: &BigUint, amount_in: &BigUint, amount_out: &BigUint) -> BigInt {
    let effective = BigInt::from(ratio_scaled(amount_out, amount_in));
    let spot = BigInt::from(spot_scaled.clone());
    (&spot - effective) * BigInt::from(10_000) / spot
}

/// Upper search bound in percent of the sell reserve; larger targets need a
/// wider window.
fn search_window_pct(target_impact: f64) -> u32 {
    if target_impact >= 0.10 {
        60
    } else {
        20
    }
}

/// Raw search. Returns the first candidate inside tolerance, otherwise the
/// closest one seen.
pub async fn search_target_impact<F, Fut>(
    reserve_sell: &BigUint,
    reserve_buy: &BigUint,
    sell_decimals: u8,
    target_impact: f64,
    settings: &SearchSettings,
    quote: F,
) -> Result<ImpactCandidate>
where
    F: Fn(BigUint) -> Fut,
    Fut: Future<Output = Result<SwapAmounts>>,
{
    if reserve_sell.is_zero() || reserve_buy.is_zero() {
        return Err(QuoterError::ZeroReserves);
    }

    let spot = ratio_scaled(reserve_buy, reserve_sell);
    if spot.is_zero() {
        // Buy side is below 10^-18 of the sell side; no meaningful price.
        return Err(QuoterError::InsufficientLiquidity);
    }

    let target_bp = BigInt::from((target_impact * 10_000.0).floor() as i64);
    let tolerance = BigInt::from(settings.tolerance_bp);
    let half_pool = reserve_sell / 2u32;

    let mut low = milli_unit(sell_decimals);
    let mut high = reserve_sell * search_window_pct(target_impact) / 100u32;
    let mut best: Option<(BigInt, ImpactCandidate)> = None;

    for iteration in 0..settings.max_iterations {
        if low > high {
            break;
        }
        let mid: BigUint = (&low + &high) / 2u32;
        if mid.is_zero() {
            break;
        }
        if mid >= half_pool {
            high = mid - 1u32;
            continue;
        }

        let swap = match with_deadline(settings.call_timeout, quote(mid.clone())).await {
            Ok(swap) if !swap.amount_out.is_zero() => swap,
            Ok(_) => {
                debug!(iteration, amount_in = %mid, "zero output, shrinking");
                high = mid - 1u32;
                continue;
            }
            Err(e) => {
                debug!(iteration, amount_in = %mid, "quote failed, shrinking: {}", e);
                high = mid - 1u32;
                continue;
            }
        };

        let impact_bp = price_impact_bp(&spot, &mid, &swap.amount_out);
        let distance = (&impact_bp - &target_bp).abs();
        let within_tolerance = distance <= tolerance;
        debug!(iteration, amount_in = %mid, amount_out = %swap.amount_out, impact_bp = %impact_bp, "search step");

        let below_target = impact_bp < target_bp;
        let candidate = ImpactCandidate { amount_in: mid.clone(), swap, impact_bp, within_tolerance };

        if within_tolerance {
            return Ok(candidate);
        }
        if best.as_ref().map_or(true, |(d, _)| distance < *d) {
            best = Some((distance, candidate));
        }

        if below_target {
            low = mid + 1u32;
        } else {
            high = mid - 1u32;
        }
    }

    match best {
        Some((distance, candidate)) => {
            debug!(target_bp = %target_bp, distance_bp = %distance, "no candidate within tolerance, using closest");
            Ok(candidate)
        }
        None => Err(QuoterError::NoQuoteFound(target_impact)),
    }
}

/// Trade size and output for a target price impact, formatted in token units.
/// The quoted amounts are the router's, not the probed size.
pub async fn find_quote_for_target_impact<F, Fut>(
    reserve_sell: &BigUint,
    reserve_buy: &BigUint,
    sell_decimals: u8,
    buy_decimals: u8,
    target_impact: f64,
    settings: &SearchSettings,
    quote: F,
) -> Result<SlippageQuote>
where
    F: Fn(BigUint) -> Fut,
    Fut: Future<Output = Result<SwapAmounts>>,
{
    let candidate = search_target_impact(reserve_sell, reserve_buy, sell_decimals, target_impact, settings, quote).await?;
    Ok(candidate.to_quote(sell_decimals, buy_decimals))
}
