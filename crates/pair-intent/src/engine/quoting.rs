//! Constant-product quoting.
//!
//! Two separate paths live here:
//! - [`quote`] is integer-only and is the only function whose result may end
//!   up in an on-chain amount.
//! - [`curve_points`], [`reserve_curve`] and [`derive_price`] return floats and
//!   exist for charts.

use std::ops::RangeInclusive;

use alloy_primitives::U256;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::ArithmeticError;
use crate::utils::units::u256_to_f64;

/// Pair contract fee: 0.3%.
pub const DEFAULT_FEE_BPS: u32 = 30;

/// Basis-point denominator (10 000 = 100%).
const BPS_DENOMINATOR: u64 = 10_000;

/// Default x-range sampled for reserve curves.
pub const DEFAULT_CURVE_DOMAIN: RangeInclusive<u64> = 1..=100;

/// Points above this y value are dropped from reserve curves.
pub const DEFAULT_CURVE_CEILING: f64 = 1e12;

/// Output amount for an exact-in swap against `(reserve_in, reserve_out)`.
///
/// ```text
/// amount_in_with_fee = amount_in * (10000 - fee_bps)
/// amount_out = floor(amount_in_with_fee * reserve_out / (reserve_in * 10000 + amount_in_with_fee))
/// ```
///
/// The result is always strictly below `reserve_out`. Empty reserves are an
/// error, never a zero quote.
pub fn quote(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<U256, ArithmeticError> {
    if u64::from(fee_bps) > BPS_DENOMINATOR {
        return Err(ArithmeticError::InvalidFee(fee_bps));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(ArithmeticError::ZeroReserves);
    }

    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(BPS_DENOMINATOR - u64::from(fee_bps)))
        .ok_or(ArithmeticError::Overflow("amount in with fee"))?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(ArithmeticError::Overflow("quote numerator"))?;
    let denominator = reserve_in
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
        .ok_or(ArithmeticError::Overflow("quote denominator"))?;

    // denominator >= reserve_in * 10000 > 0
    Ok(numerator / denominator)
}

/// One sample of the `x * y = k` curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

/// Sampling window for reserve curves.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSpec {
    pub domain: RangeInclusive<u64>,
    pub ceiling: f64,
}

impl Default for CurveSpec {
    fn default() -> Self {
        Self { domain: DEFAULT_CURVE_DOMAIN, ceiling: DEFAULT_CURVE_CEILING }
    }
}

/// Samples `y = k / x` over the integer `domain`, keeping only points with
/// `0 < y <= ceiling`.
pub fn curve_points(k: f64, domain: RangeInclusive<u64>, ceiling: f64) -> Vec<CurvePoint> {
    domain
        .filter(|&x| x > 0)
        .map(|x| {
            let x = x as f64;
            CurvePoint { x, y: k / x }
        })
        .filter(|p| p.y.is_finite() && p.y > 0.0 && p.y <= ceiling)
        .collect()
}

/// The curve through a pair's current reserves (human units).
pub fn reserve_curve(reserve0: Decimal, reserve1: Decimal, spec: &CurveSpec) -> Vec<CurvePoint> {
    let k = reserve0.to_f64().unwrap_or(0.0) * reserve1.to_f64().unwrap_or(0.0);
    curve_points(k, spec.domain.clone(), spec.ceiling)
}

/// Historical execution price `amount_out / amount_in`. `None` for a zero input.
pub fn derive_price(amount_in: U256, amount_out: U256) -> Option<f64> {
    if amount_in.is_zero() {
        return None;
    }
    Some(u256_to_f64(amount_out) / u256_to_f64(amount_in))
}
