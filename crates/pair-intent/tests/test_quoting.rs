//! Quote engine tests for pair-intent.

use std::str::FromStr;

use pair_intent::engine::quoting::{
    curve_points, derive_price, quote, reserve_curve, CurveSpec, DEFAULT_FEE_BPS,
};
use pair_intent::types::ArithmeticError;
use pair_intent::U256;
use rust_decimal::Decimal;

fn u(v: u64) -> U256 {
    U256::from(v)
}

#[test]
fn quote_matches_integer_formula() {
    // 1000 * 9970 * 50000 / (100000 * 10000 + 1000 * 9970) = 493.57..
    assert_eq!(quote(u(1000), u(100_000), u(50_000), DEFAULT_FEE_BPS).unwrap(), u(493));
    // Reversed direction on the same pool.
    assert_eq!(quote(u(1000), u(50_000), u(100_000), DEFAULT_FEE_BPS).unwrap(), u(1955));
}

#[test]
fn zero_fee_is_plain_constant_product() {
    // 100 * 1000 / (1000 + 100) = 90.9..
    assert_eq!(quote(u(100), u(1000), u(1000), 0).unwrap(), u(90));
}

#[test]
fn zero_input_quotes_zero() {
    assert_eq!(quote(U256::ZERO, u(1000), u(1000), DEFAULT_FEE_BPS).unwrap(), U256::ZERO);
}

#[test]
fn empty_reserves_are_an_error() {
    let empty_in = quote(u(1), U256::ZERO, u(1000), DEFAULT_FEE_BPS);
    assert_eq!(empty_in, Err(ArithmeticError::ZeroReserves));
    let empty_out = quote(u(1), u(1000), U256::ZERO, DEFAULT_FEE_BPS);
    assert_eq!(empty_out, Err(ArithmeticError::ZeroReserves));
}

#[test]
fn fee_above_one_hundred_percent_is_rejected() {
    assert_eq!(quote(u(1), u(10), u(10), 10_001), Err(ArithmeticError::InvalidFee(10_001)));
    // A 100% fee is allowed and swallows the whole input.
    assert_eq!(quote(u(1000), u(10), u(10), 10_000).unwrap(), U256::ZERO);
}

#[test]
fn overflow_is_reported_not_wrapped() {
    let err = quote(U256::MAX, u(1), u(1), DEFAULT_FEE_BPS).unwrap_err();
    assert!(matches!(err, ArithmeticError::Overflow(_)));
}

#[test]
fn huge_trades_never_drain_the_pool() {
    let out = quote(u(u64::MAX), u(10), u(1_000_000), DEFAULT_FEE_BPS).unwrap();
    assert!(out < u(1_000_000));
}

#[test]
fn curve_drops_points_above_ceiling() {
    let points = curve_points(1000.0, 1..=10, 200.0);
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    assert_eq!(points[0].y, 200.0);
}

#[test]
fn empty_pool_has_no_curve() {
    assert!(curve_points(0.0, 1..=100, 1e12).is_empty());
    assert!(curve_points(-5.0, 1..=100, 1e12).is_empty());
}

#[test]
fn reserve_curve_samples_default_domain() {
    let points = reserve_curve(Decimal::from(100), Decimal::from(2000), &CurveSpec::default());
    assert_eq!(points.len(), 100);
    assert_eq!(points.first().map(|p| (p.x, p.y)), Some((1.0, 200_000.0)));
    assert_eq!(points.last().map(|p| (p.x, p.y)), Some((100.0, 2000.0)));
}

#[test]
fn reserve_curve_respects_custom_window() {
    let spec = CurveSpec { domain: 0..=4, ceiling: 1.0 };
    let points = reserve_curve(Decimal::from_str("0.5").unwrap(), Decimal::from(4), &spec);
    // k = 2; x = 0 is skipped, then only x = 2, 3, 4 stay under the ceiling.
    assert_eq!(points.len(), 3);
}

#[test]
fn price_is_output_over_input() {
    assert_eq!(derive_price(u(2), u(1)), Some(0.5));
    assert_eq!(derive_price(u(1000), u(493)), Some(0.493));
    assert_eq!(derive_price(U256::ZERO, u(5)), None);
}
