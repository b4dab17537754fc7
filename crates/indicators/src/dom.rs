//! DOM / Liquidity Analyzer
//!
//! Periodically rescans a depth snapshot of the live book for the nearest
//! resting "wall" of support below and resistance above a reference price.
//! Also reports the directional imbalance of resting size near the touch.

use berg_core::{Side, Size, Tick, Timestamp};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomConfig {
    /// Minimum resting size for a level to count as support/resistance
    pub min_wall_volume: Size,
    /// How far from the reference price to look for walls
    pub scan_range_ticks: i64,
    /// Minimum time between rescans
    pub rescan_interval_ms: i64,
    /// Levels per side summed for the imbalance ratio
    pub imbalance_levels: usize,
    /// A wall within this many ticks counts as "close"
    pub proximity_ticks: i64,
    /// |imbalance| needed before it counts as directional
    pub imbalance_threshold: Decimal,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            min_wall_volume: 50,
            scan_range_ticks: 40,
            rescan_interval_ms: 1000,
            imbalance_levels: 10,
            proximity_ticks: 8,
            imbalance_threshold: dec!(0.2),
        }
    }
}

/// Resting volume at one price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityLevel {
    pub price: Tick,
    pub volume: Size,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub reference: Tick,
    pub support: Option<LiquidityLevel>,
    pub resistance: Option<LiquidityLevel>,
    /// Resting bid size across the imbalance levels
    pub bid_volume: Size,
    /// Resting ask size across the imbalance levels
    pub ask_volume: Size,
    pub scanned_at: Timestamp,
}

/// Largest confluence adjustment the DOM can contribute either way
pub const MAX_DOM_ADJUSTMENT: i32 = 10;

#[derive(Debug, Clone)]
pub struct LiquidityAnalyzer {
    config: DomConfig,
    snapshot: Option<DomSnapshot>,
}

impl LiquidityAnalyzer {
    pub fn new(config: DomConfig) -> Self {
        Self {
            config,
            snapshot: None,
        }
    }

    pub fn config(&self) -> &DomConfig {
        &self.config
    }

    /// Rescan if the rescan interval has elapsed
    ///
    /// `bids` best-first (descending), `asks` best-first (ascending).
    /// Returns true when a new snapshot was taken.
    pub fn scan(
        &mut self,
        bids: &[LiquidityLevel],
        asks: &[LiquidityLevel],
        reference: Tick,
        now: Timestamp,
    ) -> bool {
        if let Some(snapshot) = &self.snapshot {
            if now - snapshot.scanned_at < Duration::milliseconds(self.config.rescan_interval_ms) {
                return false;
            }
        }
        self.force_scan(bids, asks, reference, now);
        true
    }

    /// Rescan regardless of the interval
    pub fn force_scan(
        &mut self,
        bids: &[LiquidityLevel],
        asks: &[LiquidityLevel],
        reference: Tick,
        now: Timestamp,
    ) {
        let range = self.config.scan_range_ticks;
        let min = self.config.min_wall_volume;

        let support = bids
            .iter()
            .filter(|l| l.price <= reference && reference - l.price <= range)
            .filter(|l| l.volume >= min)
            .max_by_key(|l| l.price)
            .copied();
        let resistance = asks
            .iter()
            .filter(|l| l.price >= reference && l.price - reference <= range)
            .filter(|l| l.volume >= min)
            .min_by_key(|l| l.price)
            .copied();

        let n = self.config.imbalance_levels;
        let bid_volume = bids.iter().take(n).map(|l| l.volume).sum();
        let ask_volume = asks.iter().take(n).map(|l| l.volume).sum();

        log::debug!(
            "[DOM] Scan @ {}: support={:?} resistance={:?} bid_vol={} ask_vol={}",
            reference,
            support,
            resistance,
            bid_volume,
            ask_volume
        );

        self.snapshot = Some(DomSnapshot {
            reference,
            support,
            resistance,
            bid_volume,
            ask_volume,
            scanned_at: now,
        });
    }

    pub fn snapshot(&self) -> Option<&DomSnapshot> {
        self.snapshot.as_ref()
    }

    /// Nearest qualifying support at or below the last reference
    pub fn support(&self) -> Option<LiquidityLevel> {
        self.snapshot.as_ref().and_then(|s| s.support)
    }

    /// Nearest qualifying resistance at or above the last reference
    pub fn resistance(&self) -> Option<LiquidityLevel> {
        self.snapshot.as_ref().and_then(|s| s.resistance)
    }

    /// (bid - ask) / (bid + ask) in [-1, 1]; positive means bid-heavy
    pub fn imbalance_ratio(&self) -> Decimal {
        let Some(s) = &self.snapshot else {
            return Decimal::ZERO;
        };
        let total = s.bid_volume + s.ask_volume;
        if total == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(s.bid_volume) - Decimal::from(s.ask_volume)) / Decimal::from(total)
    }

    /// Confluence points for a signal on `side` at `price`, clamped to ±10
    pub fn confluence_adjustment(&self, side: Side, price: Tick) -> i32 {
        let Some(s) = &self.snapshot else {
            return 0;
        };
        let near = |level: Option<LiquidityLevel>| {
            level.is_some_and(|l| (l.price - price).abs() <= self.config.proximity_ticks)
        };
        let support_close = near(s.support);
        let resistance_close = near(s.resistance);

        let mut adjustment = 0;
        match side {
            Side::Bid => {
                if support_close {
                    adjustment += 4;
                }
                if resistance_close {
                    adjustment -= 4;
                }
            }
            Side::Ask => {
                if resistance_close {
                    adjustment += 4;
                }
                if support_close {
                    adjustment -= 4;
                }
            }
        }

        let ratio = self.imbalance_ratio() * Decimal::from(side.sign());
        if ratio >= self.config.imbalance_threshold {
            adjustment += 3;
        } else if ratio <= -self.config.imbalance_threshold {
            adjustment -= 3;
        }

        adjustment.clamp(-MAX_DOM_ADJUSTMENT, MAX_DOM_ADJUSTMENT)
    }

    pub fn reset(&mut self) {
        self.snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lvl(price: Tick, volume: Size) -> LiquidityLevel {
        LiquidityLevel { price, volume }
    }

    #[test]
    fn test_finds_nearest_walls() {
        let now = Utc::now();
        let mut dom = LiquidityAnalyzer::new(DomConfig::default());
        let bids = [lvl(99, 10), lvl(97, 80), lvl(90, 200)];
        let asks = [lvl(101, 20), lvl(104, 60)];
        assert!(dom.scan(&bids, &asks, 100, now));

        assert_eq!(dom.support(), Some(lvl(97, 80)));
        assert_eq!(dom.resistance(), Some(lvl(104, 60)));
        // (290 - 80) / 370
        assert!(dom.imbalance_ratio() > dec!(0.5));
    }

    #[test]
    fn test_rescan_interval() {
        let now = Utc::now();
        let mut dom = LiquidityAnalyzer::new(DomConfig::default());
        assert!(dom.scan(&[], &[], 100, now));
        assert!(!dom.scan(&[], &[], 100, now + Duration::milliseconds(500)));
        assert!(dom.scan(&[], &[], 100, now + Duration::milliseconds(1000)));
    }

    #[test]
    fn test_confluence_adjustment_is_bounded() {
        let now = Utc::now();
        let mut dom = LiquidityAnalyzer::new(DomConfig::default());
        dom.force_scan(&[lvl(99, 500)], &[lvl(101, 10)], 100, now);

        // support close, bid-heavy
        assert_eq!(dom.confluence_adjustment(Side::Bid, 100), 7);
        assert_eq!(dom.confluence_adjustment(Side::Ask, 100), -7);
        for side in [Side::Bid, Side::Ask] {
            let adj = dom.confluence_adjustment(side, 100);
            assert!((-MAX_DOM_ADJUSTMENT..=MAX_DOM_ADJUSTMENT).contains(&adj));
        }
    }
}
