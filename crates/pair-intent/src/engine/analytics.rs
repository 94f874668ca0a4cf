//! Swap count and volume over a pair's `Swap` logs.

use alloy_primitives::U256;
use serde::Serialize;

use crate::types::{ArithmeticError, SwapEvent};

/// Traded volume of each side of a pair, in raw units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairVolume {
    pub token0: U256,
    pub token1: U256,
}

/// Number of well-formed swaps.
pub fn swap_count(events: &[SwapEvent]) -> usize {
    events.iter().filter(|e| e.is_well_formed()).count()
}

/// Per-token volume: for each well-formed event, `amountXIn + amountXOut`.
///
/// A swap touches each token once (one side in, the other out), so this is
/// the amount of each token that changed hands.
pub fn volume(events: &[SwapEvent]) -> Result<PairVolume, ArithmeticError> {
    events
        .iter()
        .filter(|e| e.is_well_formed())
        .try_fold(PairVolume::default(), |acc, e| {
            let token0 = acc
                .token0
                .checked_add(e.amount0_in)
                .and_then(|v| v.checked_add(e.amount0_out))
                .ok_or(ArithmeticError::Overflow("token0 volume"))?;
            let token1 = acc
                .token1
                .checked_add(e.amount1_in)
                .and_then(|v| v.checked_add(e.amount1_out))
                .ok_or(ArithmeticError::Overflow("token1 volume"))?;
            Ok(PairVolume { token0, token1 })
        })
}
