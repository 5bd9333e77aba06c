//! Address validation and normalisation.
//!
//! Accepts `0x`-prefixed, 40 hex digit addresses. All-lowercase and
//! all-uppercase inputs are taken as-is; mixed-case inputs must carry a valid
//! EIP-55 checksum.

use alloy_primitives::Address;

use crate::types::{QuoterError, Result};

/// Parse and validate an address string.
pub fn normalize_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| QuoterError::InvalidAddress(input.to_string()))?;

    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(QuoterError::InvalidAddress(input.to_string()));
    }

    let bytes = hex::decode(body).map_err(|_| QuoterError::InvalidAddress(input.to_string()))?;
    let address = Address::from_slice(&bytes);

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None)[2..] != *body {
        return Err(QuoterError::InvalidAddress(format!("{} (bad checksum)", input)));
    }

    Ok(address)
}

/// EIP-55 checksummed form.
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

    #[test]
    fn accepts_checksummed_and_lowercase() {
        let a = normalize_address(WETH).unwrap();
        let b = normalize_address(&WETH.to_lowercase()).unwrap();
        assert_eq!(a, b);
        assert_eq!(to_checksum(&a), WETH);
    }

    #[test]
    fn accepts_uppercase_body() {
        let upper = format!("0x{}", WETH[2..].to_uppercase());
        assert!(normalize_address(&upper).is_ok());
    }

    #[test]
    fn rejects_bad_checksum() {
        let broken = WETH.replace("C02aaA", "C02AAa");
        assert!(matches!(normalize_address(&broken), Err(QuoterError::InvalidAddress(_))));
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "0x", "C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "0x1234", "0xZZ2aaa39b223fe8d0a0e5c4f27ead9083c756cc2"] {
            assert!(normalize_address(bad).is_err(), "{bad} should be rejected");
        }
    }
}
