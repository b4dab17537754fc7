//! Tape Speed Tracker
//!
//! Trades and volume per second over a short rolling window. Very fast
//! tape with price going nowhere is exhaustion; fast tape carrying price
//! in the dominant aggressor's direction is urgency.

use berg_core::{Aggressor, Side, Tick, Timestamp, Trade};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeSpeedConfig {
    pub window_ms: i64,
    /// Trades per second at or above which the tape is fast
    pub fast_tps: Decimal,
    /// Trades per second at or above which the tape is extreme
    pub extreme_tps: Decimal,
    /// Price range (ticks) at or below which fast tape counts as stalled
    pub stall_ticks: i64,
    /// Directed price move (ticks) needed for urgency
    pub urgency_ticks: i64,
}

impl Default for TapeSpeedConfig {
    fn default() -> Self {
        Self {
            window_ms: 5000,
            fast_tps: Decimal::from(5),
            extreme_tps: Decimal::from(15),
            stall_ticks: 2,
            urgency_ticks: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedLevel {
    Idle,
    Slow,
    Normal,
    Fast,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapeCondition {
    Normal,
    /// Extreme speed, price stalled
    Exhaustion,
    /// Fast tape pushing price in the aggressor's direction
    Urgency(Aggressor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeReading {
    pub trades_per_second: Decimal,
    pub volume_per_second: Decimal,
    pub level: SpeedLevel,
    pub condition: TapeCondition,
    /// Last price minus first price in the window
    pub price_change: i64,
}

impl TapeReading {
    /// Urgency in the direction of `side`
    pub fn urgent_for(&self, side: Side) -> bool {
        self.condition == TapeCondition::Urgency(side.aligned_aggressor())
    }
}

#[derive(Debug, Clone, Copy)]
struct Print {
    price: Tick,
    delta: i64,
    size: u64,
    timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TapeSpeedTracker {
    config: TapeSpeedConfig,
    prints: VecDeque<Print>,
}

impl TapeSpeedTracker {
    pub fn new(config: TapeSpeedConfig) -> Self {
        Self {
            config,
            prints: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Timestamp) {
        let cutoff = now - Duration::milliseconds(self.config.window_ms);
        while self.prints.front().is_some_and(|p| p.timestamp < cutoff) {
            self.prints.pop_front();
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        self.prints.push_back(Print {
            price: trade.price,
            delta: trade.signed_size(),
            size: trade.size,
            timestamp: trade.timestamp,
        });
        self.prune(trade.timestamp);
    }

    pub fn reading(&self, now: Timestamp) -> TapeReading {
        let cutoff = now - Duration::milliseconds(self.config.window_ms);
        let window: Vec<&Print> = self.prints.iter().filter(|p| p.timestamp >= cutoff).collect();

        let secs = Decimal::new(self.config.window_ms.max(1), 3);
        let count = window.len() as u64;
        let volume: u64 = window.iter().map(|p| p.size).sum();
        let tps = Decimal::from(count) / secs;
        let vps = Decimal::from(volume) / secs;

        let level = if count == 0 {
            SpeedLevel::Idle
        } else if tps >= self.config.extreme_tps {
            SpeedLevel::Extreme
        } else if tps >= self.config.fast_tps {
            SpeedLevel::Fast
        } else if tps >= Decimal::ONE {
            SpeedLevel::Normal
        } else {
            SpeedLevel::Slow
        };

        let (price_change, range, net) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => {
                let high = window.iter().map(|p| p.price).max().unwrap_or(last.price);
                let low = window.iter().map(|p| p.price).min().unwrap_or(last.price);
                let net: i64 = window.iter().map(|p| p.delta).sum();
                (last.price - first.price, high - low, net)
            }
            _ => (0, 0, 0),
        };

        let condition = if level == SpeedLevel::Extreme && range <= self.config.stall_ticks {
            TapeCondition::Exhaustion
        } else if level >= SpeedLevel::Fast
            && price_change.abs() >= self.config.urgency_ticks
            && net.signum() == price_change.signum()
        {
            if price_change > 0 {
                TapeCondition::Urgency(Aggressor::Buy)
            } else {
                TapeCondition::Urgency(Aggressor::Sell)
            }
        } else {
            TapeCondition::Normal
        };

        TapeReading {
            trades_per_second: tps,
            volume_per_second: vps,
            level,
            condition,
            price_change,
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
    use rust_decimal_macros::dec;

    #[test]
    fn test_exhaustion() {
        let t0 = Utc::now();
        let mut tape = TapeSpeedTracker::new(TapeSpeedConfig::default());
        // 100 prints in 4s within one tick
        for i in 0..100 {
            tape.update(&Trade::buy(1000 + (i % 2), 2, t0 + Duration::milliseconds(i * 40)));
        }
        let reading = tape.reading(t0 + Duration::milliseconds(4000));
        assert_eq!(reading.trades_per_second, dec!(20));
        assert_eq!(reading.level, SpeedLevel::Extreme);
        assert_eq!(reading.condition, TapeCondition::Exhaustion);
    }

    #[test]
    fn test_urgency() {
        let t0 = Utc::now();
        let mut tape = TapeSpeedTracker::new(TapeSpeedConfig::default());
        for i in 0..30 {
            tape.update(&Trade::sell(1000 - i / 3, 5, t0 + Duration::milliseconds(i * 100)));
        }
        let reading = tape.reading(t0 + Duration::milliseconds(3000));
        assert_eq!(reading.level, SpeedLevel::Fast);
        assert_eq!(reading.condition, TapeCondition::Urgency(Aggressor::Sell));
        assert!(reading.urgent_for(Side::Ask));
    }

    #[test]
    fn test_idle() {
        let tape = TapeSpeedTracker::new(TapeSpeedConfig::default());
        assert_eq!(tape.reading(Utc::now()).level, SpeedLevel::Idle);
    }
}
