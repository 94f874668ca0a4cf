//! Rebuilds a pair's price history from its `Swap` logs.

use tracing::warn;

use crate::engine::quoting::derive_price;
use crate::types::{PricePoint, SwapEvent};

/// Turns logs into chart points, lazily.
///
/// For each event `price = output / input`, where input and output are the
/// non-zero sides of the event. `index` is the 1-based position of the event in
/// `events`, which are taken in the order the log source returned them.
///
/// Malformed events (both or neither side of an input/output pair non-zero)
/// are skipped with a warning instead of failing the batch, so one bad log
/// cannot blank a chart. Skipped events still consume their index.
///
/// The iterator borrows `events` and keeps no state of its own; calling this
/// again restarts from the first event.
pub fn reconstruct(events: &[SwapEvent]) -> impl Iterator<Item = PricePoint> + '_ {
    events.iter().enumerate().filter_map(|(position, event)| {
        let index = position + 1;
        let (Some(input), Some(output)) = (event.input(), event.output()) else {
            warn!(index, ?event, "skipping malformed swap event");
            return None;
        };
        derive_price(input, output).map(|price| PricePoint { index, price })
    })
}

/// [`reconstruct`] collected into a vector.
pub fn price_history(events: &[SwapEvent]) -> Vec<PricePoint> {
    reconstruct(events).collect()
}
