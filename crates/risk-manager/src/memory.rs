//! Trade Memory
//!
//! The last N resolved signals with their maximum favourable and adverse
//! excursions. Feeds the memory-based stop/target candidate.

use berg_core::{Side, Tick, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Excursions of one resolved signal, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeExcursion {
    pub side: Side,
    pub entry_price: Tick,
    /// Maximum favourable excursion
    pub mfe_ticks: i64,
    /// Maximum adverse excursion (positive number)
    pub mae_ticks: i64,
    pub profitable: bool,
    pub closed_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TradeMemory {
    capacity: usize,
    trades: VecDeque<TradeExcursion>,
}

impl TradeMemory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            trades: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, trade: TradeExcursion) {
        if self.trades.len() == self.capacity {
            self.trades.pop_front();
        }
        self.trades.push_back(trade);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    fn average(&self, f: impl Fn(&TradeExcursion) -> i64) -> Option<Decimal> {
        if self.trades.is_empty() {
            return None;
        }
        let sum: i64 = self.trades.iter().map(f).sum();
        Some(Decimal::from(sum) / Decimal::from(self.trades.len() as u64))
    }

    pub fn avg_mfe(&self) -> Option<Decimal> {
        self.average(|t| t.mfe_ticks.max(0))
    }

    pub fn avg_mae(&self) -> Option<Decimal> {
        self.average(|t| t.mae_ticks.max(0))
    }

    /// Fraction of remembered signals that resolved profitable
    pub fn win_rate(&self) -> Option<Decimal> {
        self.average(|t| t.profitable as i64)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeExcursion> {
        self.trades.iter()
    }
}

impl Default for TradeMemory {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn excursion(mfe: i64, mae: i64) -> TradeExcursion {
        TradeExcursion {
            side: Side::Bid,
            entry_price: 1000,
            mfe_ticks: mfe,
            mae_ticks: mae,
            profitable: mfe > mae,
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_bounded_averages() {
        let mut memory = TradeMemory::new(3);
        assert_eq!(memory.avg_mfe(), None);
        for (mfe, mae) in [(100, 100), (10, 4), (20, 6), (12, 8)] {
            memory.record(excursion(mfe, mae));
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.avg_mfe(), Some(dec!(14)));
        assert_eq!(memory.avg_mae(), Some(dec!(6)));
        assert_eq!(memory.win_rate(), Some(dec!(1)));
    }
}
