//! Swap history reconstruction and log analytics tests for pair-intent.

use pair_intent::data_management::history::{price_history, reconstruct};
use pair_intent::engine::analytics::{swap_count, volume, PairVolume};
use pair_intent::types::{ArithmeticError, PricePoint, SwapEvent};
use pair_intent::U256;

fn sell0(amount_in: u64, amount_out: u64) -> SwapEvent {
    SwapEvent {
        amount0_in: U256::from(amount_in),
        amount1_out: U256::from(amount_out),
        ..Default::default()
    }
}

fn sell1(amount_in: u64, amount_out: u64) -> SwapEvent {
    SwapEvent {
        amount1_in: U256::from(amount_in),
        amount0_out: U256::from(amount_out),
        ..Default::default()
    }
}

#[test]
fn no_events_no_points() {
    assert!(price_history(&[]).is_empty());
}

#[test]
fn single_malformed_event_is_skipped() {
    let both_in = SwapEvent {
        amount0_in: U256::from(5u64),
        amount1_in: U256::from(7u64),
        amount0_out: U256::from(1u64),
        ..Default::default()
    };
    assert!(price_history(&[both_in]).is_empty());
    assert!(price_history(&[SwapEvent::default()]).is_empty());
}

#[test]
fn points_keep_arrival_order_and_position() {
    let events = [sell0(1000, 493), SwapEvent::default(), sell1(500, 990)];
    let points = price_history(&events);
    assert_eq!(
        points,
        vec![PricePoint { index: 1, price: 0.493 }, PricePoint { index: 3, price: 1.98 }]
    );
}

#[test]
fn reconstruction_restarts_from_the_first_event() {
    let events = [sell0(4, 2), sell1(2, 4)];
    let first: Vec<_> = reconstruct(&events).collect();
    let second: Vec<_> = reconstruct(&events).collect();
    assert_eq!(first, second);
    assert_eq!(reconstruct(&events).next(), Some(PricePoint { index: 1, price: 0.5 }));
}

#[test]
fn count_and_volume_ignore_malformed_events() {
    let events = [sell0(1000, 493), SwapEvent::default(), sell1(500, 990)];
    assert_eq!(swap_count(&events), 2);
    assert_eq!(
        volume(&events).unwrap(),
        PairVolume { token0: U256::from(1990u64), token1: U256::from(993u64) }
    );
    assert_eq!(volume(&[]).unwrap(), PairVolume::default());
}

#[test]
fn volume_overflow_is_an_error() {
    let events = [
        SwapEvent { amount0_in: U256::MAX, amount1_out: U256::from(1u64), ..Default::default() },
        sell0(1, 1),
    ];
    assert!(matches!(volume(&events), Err(ArithmeticError::Overflow(_))));
}
