//! Property tests: quote bounds and monotonicity, validator determinism.

use pair_intent::engine::quoting::{quote, DEFAULT_FEE_BPS};
use pair_intent::intent::validate;
use pair_intent::{TokenRegistry, U256};
use proptest::prelude::*;
use serde_json::{json, Value};

const MAX: u128 = 1_000_000_000_000_000_000_000_000_000_000; // 1e30

fn amount() -> impl Strategy<Value = u128> {
    0..=MAX
}

fn reserve() -> impl Strategy<Value = u128> {
    1..=MAX
}

fn symbol() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("BTC")),
        Just(json!("ETH")),
        Just(json!("USDT")),
        Just(json!("NOPE")),
        Just(json!("")),
        Just(json!(["BTC", "ETH"])),
        Just(Value::Null),
    ]
}

fn raw_intent() -> impl Strategy<Value = Value> {
    let action = prop_oneof![
        Just("swap"),
        Just("deposit"),
        Just("redeem"),
        Just("query"),
        Just("mint"),
        Just(""),
    ];
    let kind = prop_oneof![
        Just(json!("reserves")),
        Just(json!("volume")),
        Just(json!("impact")),
        Just(json!(["swaps"])),
    ];
    (action, symbol(), symbol(), -5i64..50, kind).prop_map(|(action, a, b, amount, kind)| {
        json!({
            "action": action,
            "tokenIn": a,
            "tokenOut": b,
            "amount": amount,
            "amounts": [{"token": a, "amount": amount}, {"token": b, "amount": 1}],
            "pool": [a, b],
            "type": kind,
        })
    })
}

/// Default-fee quote over plain integers.
fn quote_u128(amount_in: u128, reserve_in: u128, reserve_out: u128) -> U256 {
    let (a, r_in, r_out) = (U256::from(amount_in), U256::from(reserve_in), U256::from(reserve_out));
    quote(a, r_in, r_out, DEFAULT_FEE_BPS).unwrap()
}

proptest! {
    #[test]
    fn quote_stays_below_reserve_out(
        a in amount(),
        r_in in reserve(),
        r_out in reserve(),
        fee in 0u32..=10_000,
    ) {
        let out = quote(U256::from(a), U256::from(r_in), U256::from(r_out), fee).unwrap();
        prop_assert!(out < U256::from(r_out));
    }

    #[test]
    fn quote_non_decreasing_in_amount(
        a in amount(),
        b in amount(),
        r_in in reserve(),
        r_out in reserve(),
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(quote_u128(lo, r_in, r_out) <= quote_u128(hi, r_in, r_out));
    }

    #[test]
    fn quote_non_increasing_in_reserve_in(
        a in amount(),
        x in reserve(),
        y in reserve(),
        r_out in reserve(),
    ) {
        let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
        prop_assert!(quote_u128(a, hi, r_out) <= quote_u128(a, lo, r_out));
    }

    #[test]
    fn validation_is_deterministic(raw in raw_intent()) {
        let registry = TokenRegistry::builtin();
        prop_assert_eq!(validate(&raw, &registry), validate(&raw, &registry));
    }
}
