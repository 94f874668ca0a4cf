//! Conversion between human token amounts and raw on-chain units.
//!
//! Only [`to_raw_units`] feeds amounts sent on-chain, and it stays in integer
//! arithmetic the whole way. [`from_raw_units`] is for display.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::types::ArithmeticError;

/// `10^exp` as a `U256`.
pub fn pow10(exp: u32) -> Result<U256, ArithmeticError> {
    U256::from(10u64)
        .checked_pow(U256::from(exp))
        .ok_or(ArithmeticError::Overflow("power of ten"))
}

/// Scales a human amount by `10^decimals`.
///
/// Amounts with more fractional digits than the token supports are rejected
/// instead of being truncated.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<U256, ArithmeticError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ArithmeticError::NegativeAmount(amount));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(ArithmeticError::ExcessPrecision { amount, decimals });
    }
    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    mantissa
        .checked_mul(pow10(u32::from(decimals) - scale)?)
        .ok_or(ArithmeticError::Overflow("raw amount"))
}

/// Inverse of [`to_raw_units`]. `None` if the value does not fit a `Decimal`.
pub fn from_raw_units(raw: U256, decimals: u8) -> Option<Decimal> {
    let value = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(value, u32::from(decimals))
        .ok()
        .map(|d| d.normalize())
}

/// Lossy float view of a raw amount, for charts only.
pub fn u256_to_f64(value: U256) -> f64 {
    match u128::try_from(value) {
        Ok(small) => small as f64,
        Err(_) => value.to_string().parse().unwrap_or(f64::INFINITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn scales_whole_and_fractional_amounts() {
        let ten = to_raw_units(Decimal::from(10), 18).unwrap();
        assert_eq!(ten, U256::from(10u128 * 10u128.pow(18)));
        let one_and_half = to_raw_units(Decimal::from_str("1.5").unwrap(), 6).unwrap();
        assert_eq!(one_and_half, U256::from(1_500_000u64));
        let trailing_zeros = to_raw_units(Decimal::from_str("2.500").unwrap(), 1).unwrap();
        assert_eq!(trailing_zeros, U256::from(25u64));
    }

    #[test]
    fn rejects_dust_below_token_precision() {
        let err = to_raw_units(Decimal::from_str("0.0000001").unwrap(), 6).unwrap_err();
        assert!(matches!(err, ArithmeticError::ExcessPrecision { decimals: 6, .. }));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(matches!(
            to_raw_units(Decimal::from(-1), 18),
            Err(ArithmeticError::NegativeAmount(_))
        ));
    }

    #[test]
    fn raw_units_render_back_to_human() {
        let raw = U256::from(1_500_000u64);
        assert_eq!(from_raw_units(raw, 6), Some(Decimal::from_str("1.5").unwrap()));
        assert_eq!(from_raw_units(U256::MAX, 18), None);
    }
}
