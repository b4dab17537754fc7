//! Volume Profile
//!
//! Session histogram of traded volume per tick, split by aggressor.
//! Exposes the point of control, the value area and a local buy/sell
//! imbalance around a query price.

use berg_core::{Aggressor, Side, Tick, Trade};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    /// Share of session volume inside the value area
    pub value_area_percent: Decimal,
    /// Ticks either side of the query price included in the imbalance read
    pub imbalance_radius_ticks: i64,
    /// How close (ticks) a price must be to a profile level to count as "at" it
    pub node_tolerance_ticks: i64,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            value_area_percent: dec!(0.70),
            imbalance_radius_ticks: 2,
            node_tolerance_ticks: 2,
        }
    }
}

/// Traded volume at one price, split by aggressor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelVolume {
    pub buy: u64,
    pub sell: u64,
}

impl LevelVolume {
    pub fn total(&self) -> u64 {
        self.buy + self.sell
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueArea {
    pub poc: Tick,
    pub low: Tick,
    pub high: Tick,
    /// Volume contained in [low, high]
    pub volume: u64,
}

/// Named profile level a price sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileLevel {
    Poc,
    ValueAreaHigh,
    ValueAreaLow,
}

/// Cap on the imbalance ratio when one side traded nothing
const MAX_IMBALANCE: Decimal = dec!(10);

#[derive(Debug, Clone)]
pub struct VolumeProfile {
    config: VolumeProfileConfig,
    levels: BTreeMap<Tick, LevelVolume>,
    total: u64,
}

impl VolumeProfile {
    pub fn new(config: VolumeProfileConfig) -> Self {
        Self {
            config,
            levels: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        let level = self.levels.entry(trade.price).or_default();
        match trade.aggressor {
            Aggressor::Buy => level.buy += trade.size,
            Aggressor::Sell => level.sell += trade.size,
        }
        self.total += trade.size;
    }

    pub fn total_volume(&self) -> u64 {
        self.total
    }

    pub fn volume_at(&self, price: Tick) -> LevelVolume {
        self.levels.get(&price).copied().unwrap_or_default()
    }

    /// Price with the most traded volume (lowest price on ties)
    pub fn poc(&self) -> Option<Tick> {
        let mut best: Option<(Tick, u64)> = None;
        for (&price, level) in &self.levels {
            let volume = level.total();
            if best.is_none_or(|(_, v)| volume > v) {
                best = Some((price, volume));
            }
        }
        best.map(|(price, _)| price)
    }

    /// Contiguous band around the POC holding `value_area_percent` of volume
    ///
    /// Grows symmetrically: each step takes the next traded price below and
    /// the next traded price above together. Once one side runs out the
    /// other keeps going alone.
    pub fn value_area(&self) -> Option<ValueArea> {
        let poc = self.poc()?;
        let target = (Decimal::from(self.total) * self.config.value_area_percent)
            .ceil()
            .to_u64()
            .unwrap_or(self.total);

        let mut low = poc;
        let mut high = poc;
        let mut volume = self.volume_at(poc).total();

        while volume < target {
            let below = self.levels.range(..low).next_back();
            let above = self.levels.range(high + 1..).next();
            if below.is_none() && above.is_none() {
                break;
            }
            if let Some((&price, level)) = below {
                low = price;
                volume += level.total();
            }
            if let Some((&price, level)) = above {
                high = price;
                volume += level.total();
            }
        }

        Some(ValueArea {
            poc,
            low,
            high,
            volume,
        })
    }

    /// Buy/sell volume ratio within `imbalance_radius_ticks` of `price`
    ///
    /// Above 1 means buyers dominated, below 1 sellers. Capped at 10 (and
    /// floored at 1/10) when one side is empty. `None` with no volume nearby.
    pub fn imbalance(&self, price: Tick) -> Option<Decimal> {
        let radius = self.config.imbalance_radius_ticks.max(0);
        let (buy, sell) = self
            .levels
            .range(price - radius..=price + radius)
            .fold((0u64, 0u64), |(b, s), (_, l)| (b + l.buy, s + l.sell));

        match (buy, sell) {
            (0, 0) => None,
            (_, 0) => Some(MAX_IMBALANCE),
            (0, _) => Some(Decimal::ONE / MAX_IMBALANCE),
            (b, s) => Some((Decimal::from(b) / Decimal::from(s)).min(MAX_IMBALANCE)),
        }
    }

    /// Does the local imbalance favour `side` by at least `min_ratio`?
    pub fn imbalance_favors(&self, side: Side, price: Tick, min_ratio: Decimal) -> bool {
        let Some(ratio) = self.imbalance(price) else {
            return false;
        };
        if ratio.is_zero() {
            return side == Side::Ask;
        }
        match side {
            Side::Bid => ratio >= min_ratio,
            Side::Ask => Decimal::ONE / ratio >= min_ratio,
        }
    }

    /// Profile level within `node_tolerance_ticks` of `price`, POC first
    pub fn key_level(&self, price: Tick) -> Option<ProfileLevel> {
        let va = self.value_area()?;
        let tol = self.config.node_tolerance_ticks;
        if (price - va.poc).abs() <= tol {
            Some(ProfileLevel::Poc)
        } else if (price - va.high).abs() <= tol {
            Some(ProfileLevel::ValueAreaHigh)
        } else if (price - va.low).abs() <= tol {
            Some(ProfileLevel::ValueAreaLow)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.levels.clear();
        self.total = 0;
    }
}
