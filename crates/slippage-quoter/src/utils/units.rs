//! Raw integer amounts <-> human-readable decimal strings.

use num_bigint::BigUint;
use num_traits::Zero;

/// `10^decimals`, one whole token in raw units.
pub fn unit(decimals: u8) -> BigUint {
    BigUint::from(10u32).pow(u32::from(decimals))
}

/// 0.001 of a token in raw units (zero for tokens with fewer than 3 decimals).
pub fn milli_unit(decimals: u8) -> BigUint {
    unit(decimals) / BigUint::from(1000u32)
}

/// Format a raw amount with `decimals` fractional digits.
///
/// Trailing fractional zeros are dropped but at least one fractional digit is
/// kept, so `1500000` with 6 decimals renders as `"1.5"` and `10^18` with 18
/// decimals as `"1.0"`.
pub fn format_units(raw: &BigUint, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return format!("{}.0", digits);
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac = frac_part.trim_end_matches('0');
    format!("{}.{}", int_part, if frac.is_empty() { "0" } else { frac })
}

/// Integer `a * 10^18 / b`, the fixed-point ratio used for price math.
pub fn ratio_scaled(a: &BigUint, b: &BigUint) -> BigUint {
    if b.is_zero() {
        return BigUint::zero();
    }
    a * precision() / b
}

/// Fixed-point precision base, 10^18.
pub fn precision() -> BigUint {
    unit(18)
}
