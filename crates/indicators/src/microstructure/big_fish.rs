//! Big Fish Detector
//!
//! Tracks signed delta per price over a rolling time window. A level where
//! aggressive flow is persistently one-sided, yet price keeps coming back to
//! it, is being absorbed by a large passive participant: heavy selling into
//! a level that holds is a buyer defending it (bullish), heavy buying into
//! it is a seller defending it (bearish).

use berg_core::{Side, Tick, Timestamp, Trade};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BigFishConfig {
    pub lookback_secs: i64,
    /// Minimum |net delta| at the level
    pub min_delta: i64,
    /// |net| / gross volume needed to call the flow one-sided
    pub one_sidedness: Decimal,
    /// Returns to the level (after the first visit) required
    pub min_revisits: usize,
    /// Ticks either side of the level that count as "at" it
    pub tolerance_ticks: i64,
    /// Hard cap on retained prints
    pub max_trades: usize,
}

impl Default for BigFishConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 300,
            min_delta: 300,
            one_sidedness: dec!(0.65),
            min_revisits: 2,
            tolerance_ticks: 2,
            max_trades: 50_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BigFishSignal {
    Bullish,
    Bearish,
    None,
}

impl BigFishSignal {
    pub fn side(&self) -> Option<Side> {
        match self {
            BigFishSignal::Bullish => Some(Side::Bid),
            BigFishSignal::Bearish => Some(Side::Ask),
            BigFishSignal::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Print {
    price: Tick,
    delta: i64,
    timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct BigFishDetector {
    config: BigFishConfig,
    prints: VecDeque<Print>,
}

impl BigFishDetector {
    pub fn new(config: BigFishConfig) -> Self {
        Self {
            config,
            prints: VecDeque::new(),
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        self.prints.push_back(Print {
            price: trade.price,
            delta: trade.signed_size(),
            timestamp: trade.timestamp,
        });
        let cutoff = trade.timestamp - Duration::seconds(self.config.lookback_secs);
        while self
            .prints
            .front()
            .is_some_and(|p| p.timestamp < cutoff || self.prints.len() > self.config.max_trades)
        {
            self.prints.pop_front();
        }
    }

    /// Net delta at `price` (within tolerance) over the window
    pub fn delta_at(&self, price: Tick) -> i64 {
        let tol = self.config.tolerance_ticks;
        self.prints
            .iter()
            .filter(|p| (p.price - price).abs() <= tol)
            .map(|p| p.delta)
            .sum()
    }

    /// Is a large participant defending `price`?
    pub fn signal(&self, price: Tick) -> BigFishSignal {
        let tol = self.config.tolerance_ticks;
        let mut net = 0i64;
        let mut gross = 0i64;
        let mut visits = 0usize;
        let mut inside = false;

        for p in &self.prints {
            let at_level = (p.price - price).abs() <= tol;
            if at_level {
                net += p.delta;
                gross += p.delta.abs();
                if !inside {
                    visits += 1;
                }
            }
            inside = at_level;
        }

        if gross == 0 || net.abs() < self.config.min_delta {
            return BigFishSignal::None;
        }
        if Decimal::from(net.abs()) / Decimal::from(gross) < self.config.one_sidedness {
            return BigFishSignal::None;
        }
        if visits.saturating_sub(1) < self.config.min_revisits {
            return BigFishSignal::None;
        }

        log::debug!(
            "[BigFish] Level {} defended: net={} gross={} visits={}",
            price,
            net,
            gross,
            visits
        );
        if net < 0 {
            BigFishSignal::Bullish
        } else {
            BigFishSignal::Bearish
        }
    }

    pub fn reset(&mut self) {
        self.prints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_defended_bid() {
        let t0 = Utc::now();
        let mut fish = BigFishDetector::new(BigFishConfig::default());
        // Three separate visits to 1000, each absorbing heavy selling
        for i in 0..3 {
            let ts = t0 + Duration::seconds(i * 10);
            fish.update(&Trade::sell(1000, 150, ts));
            fish.update(&Trade::buy(1010, 5, ts));
        }
        assert_eq!(fish.delta_at(1000), -450);
        assert_eq!(fish.signal(1000), BigFishSignal::Bullish);
        assert_eq!(fish.signal(1010), BigFishSignal::None);
    }

    #[test]
    fn test_needs_revisits() {
        let t0 = Utc::now();
        let mut fish = BigFishDetector::new(BigFishConfig::default());
        fish.update(&Trade::sell(1000, 500, t0));
        assert_eq!(fish.signal(1000), BigFishSignal::None);
    }

    #[test]
    fn test_window_expiry() {
        let t0 = Utc::now();
        let mut fish = BigFishDetector::new(BigFishConfig::default());
        fish.update(&Trade::buy(1000, 500, t0));
        fish.update(&Trade::buy(1100, 1, t0 + Duration::seconds(301)));
        assert_eq!(fish.delta_at(1000), 0);
    }
}
