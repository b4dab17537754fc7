//! Volume Tail Detector
//!
//! A tail is a run of thinly traded ticks at the edge of the session's
//! traded range: price was rejected there quickly. A lower tail means
//! sellers could not hold price down (bullish), an upper tail the reverse.

use berg_core::{Side, Tick, Trade};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeTailConfig {
    /// A tick is "thin" below this fraction of the average tick volume
    pub threshold_percent: Decimal,
    pub min_tail_ticks: i64,
    /// Range must span at least this many ticks before tails are read
    pub min_range_ticks: i64,
    /// Strengths closer than this count as equal
    pub equal_strength_epsilon: Decimal,
}

impl Default for VolumeTailConfig {
    fn default() -> Self {
        Self {
            threshold_percent: dec!(0.30),
            min_tail_ticks: 2,
            min_range_ticks: 6,
            equal_strength_epsilon: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tail {
    /// Ticks in the tail
    pub length: i64,
    pub avg_volume: Decimal,
    /// 0-1, `1 - tail_avg / overall_avg`
    pub strength: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailBias {
    Bullish,
    Bearish,
    /// Tails on both ends with equal strength
    Consolidation,
    None,
}

impl TailBias {
    pub fn side(&self) -> Option<Side> {
        match self {
            TailBias::Bullish => Some(Side::Bid),
            TailBias::Bearish => Some(Side::Ask),
            TailBias::Consolidation | TailBias::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailReading {
    pub upper: Option<Tail>,
    pub lower: Option<Tail>,
    pub bias: TailBias,
}

#[derive(Debug, Clone)]
pub struct VolumeTailDetector {
    config: VolumeTailConfig,
    volume: BTreeMap<Tick, u64>,
    total: u64,
}

impl VolumeTailDetector {
    pub fn new(config: VolumeTailConfig) -> Self {
        Self {
            config,
            volume: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        *self.volume.entry(trade.price).or_default() += trade.size;
        self.total += trade.size;
    }

    /// (low, high) of the traded range
    pub fn range(&self) -> Option<(Tick, Tick)> {
        let low = *self.volume.keys().next()?;
        let high = *self.volume.keys().next_back()?;
        Some((low, high))
    }

    /// Walk inward from a range edge while ticks stay thin
    fn tail_from(&self, ticks: impl Iterator<Item = Tick>, avg: Decimal, max_len: i64) -> Option<Tail> {
        let thin = avg * self.config.threshold_percent;
        let mut length = 0i64;
        let mut volume = 0u64;
        for tick in ticks.take(max_len.max(0) as usize) {
            let v = self.volume.get(&tick).copied().unwrap_or(0);
            if Decimal::from(v) >= thin {
                break;
            }
            length += 1;
            volume += v;
        }
        if length < self.config.min_tail_ticks {
            return None;
        }
        let avg_volume = Decimal::from(volume) / Decimal::from(length);
        let strength = (Decimal::ONE - avg_volume / avg).clamp(Decimal::ZERO, Decimal::ONE);
        Some(Tail {
            length,
            avg_volume,
            strength,
        })
    }

    pub fn reading(&self) -> TailReading {
        let none = TailReading {
            upper: None,
            lower: None,
            bias: TailBias::None,
        };
        let Some((low, high)) = self.range() else {
            return none;
        };
        let span = high - low + 1;
        if span < self.config.min_range_ticks || self.total == 0 {
            return none;
        }
        let avg = Decimal::from(self.total) / Decimal::from(span);
        // A tail may cover at most half of the range
        let max_len = span / 2;

        let upper = self.tail_from((low..=high).rev(), avg, max_len);
        let lower = self.tail_from(low..=high, avg, max_len);

        let bias = match (&upper, &lower) {
            (None, None) => TailBias::None,
            (Some(_), None) => TailBias::Bearish,
            (None, Some(_)) => TailBias::Bullish,
            (Some(u), Some(l)) => {
                if (u.strength - l.strength).abs() <= self.config.equal_strength_epsilon {
                    TailBias::Consolidation
                } else if l.strength > u.strength {
                    TailBias::Bullish
                } else {
                    TailBias::Bearish
                }
            }
        };

        TailReading { upper, lower, bias }
    }

    /// Start a new range (session rollover)
    pub fn reset(&mut self) {
        self.volume.clear();
        self.total = 0;
    }
}
