//! Session VWAP
//!
//! VWAP = Σ(price × size) / Σ(size) since session start. Sums are kept as
//! exact integers so the value is identical under replay.

use berg_core::{Side, Tick, Trade};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct Vwap {
    sum_price_volume: i128,
    sum_volume: u128,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, trade: &Trade) {
        self.sum_price_volume += trade.price as i128 * trade.size as i128;
        self.sum_volume += trade.size as u128;
    }

    /// Current VWAP in ticks, `None` before any volume
    pub fn value(&self) -> Option<Decimal> {
        if self.sum_volume == 0 {
            return None;
        }
        Some(
            Decimal::from_i128_with_scale(self.sum_price_volume, 0)
                / Decimal::from_i128_with_scale(self.sum_volume as i128, 0),
        )
    }

    /// Distance of `price` from VWAP in the direction of `side` (positive = supportive)
    pub fn signed_distance(&self, side: Side, price: Tick) -> Option<Decimal> {
        self.value()
            .map(|vwap| (Decimal::from(price) - vwap) * Decimal::from(side.sign()))
    }

    /// Start a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
