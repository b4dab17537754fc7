//! Confluence Scorer
//!
//! Folds every indicator and microstructure read into one signed score for
//! an iceberg candidate. Weights are table-driven: each has a default and a
//! safety range, and every write is clamped into that range.

use berg_core::{SessionPhase, Side, Size, Tick, Timestamp};
use berg_indicators::{IndicatorSuite, MAX_DOM_ADJUSTMENT, TapeCondition};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named confluence weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKey {
    /// Cap on the iceberg size contribution (size / 10)
    IcebergSize,
    CvdAlignment,
    CvdDivergencePenalty,
    DivergencePattern,
    VolumeProfileNode,
    VolumeImbalance,
    EmaAlignment,
    VwapAlignment,
    VwapDivergencePenalty,
    TimeOfDay,
    BigFish,
    VolumeTail,
    TapeSpeed,
    StopHunt,
}

impl WeightKey {
    pub const ALL: [WeightKey; 14] = [
        WeightKey::IcebergSize,
        WeightKey::CvdAlignment,
        WeightKey::CvdDivergencePenalty,
        WeightKey::DivergencePattern,
        WeightKey::VolumeProfileNode,
        WeightKey::VolumeImbalance,
        WeightKey::EmaAlignment,
        WeightKey::VwapAlignment,
        WeightKey::VwapDivergencePenalty,
        WeightKey::TimeOfDay,
        WeightKey::BigFish,
        WeightKey::VolumeTail,
        WeightKey::TapeSpeed,
        WeightKey::StopHunt,
    ];

    pub fn default_value(&self) -> i32 {
        match self {
            WeightKey::IcebergSize => 20,
            WeightKey::CvdAlignment => 10,
            WeightKey::CvdDivergencePenalty => 15,
            WeightKey::DivergencePattern => 8,
            WeightKey::VolumeProfileNode => 8,
            WeightKey::VolumeImbalance => 6,
            WeightKey::EmaAlignment => 12,
            WeightKey::VwapAlignment => 8,
            WeightKey::VwapDivergencePenalty => 8,
            WeightKey::TimeOfDay => 5,
            WeightKey::BigFish => 10,
            WeightKey::VolumeTail => 6,
            WeightKey::TapeSpeed => 5,
            WeightKey::StopHunt => 10,
        }
    }

    /// Inclusive (min, max) safety range
    pub fn bounds(&self) -> (i32, i32) {
        match self {
            WeightKey::IcebergSize => (0, 40),
            WeightKey::CvdAlignment => (0, 25),
            WeightKey::CvdDivergencePenalty => (0, 30),
            WeightKey::DivergencePattern => (0, 20),
            WeightKey::VolumeProfileNode => (0, 20),
            WeightKey::VolumeImbalance => (0, 15),
            WeightKey::EmaAlignment => (0, 25),
            WeightKey::VwapAlignment => (0, 20),
            WeightKey::VwapDivergencePenalty => (0, 20),
            WeightKey::TimeOfDay => (0, 15),
            WeightKey::BigFish => (0, 20),
            WeightKey::VolumeTail => (0, 15),
            WeightKey::TapeSpeed => (0, 15),
            WeightKey::StopHunt => (0, 20),
        }
    }
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Bounded confluence weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<WeightKey, i32>", into = "BTreeMap<WeightKey, i32>")]
pub struct ConfluenceWeights {
    values: BTreeMap<WeightKey, i32>,
}

impl Default for ConfluenceWeights {
    fn default() -> Self {
        Self {
            values: WeightKey::ALL.iter().map(|k| (*k, k.default_value())).collect(),
        }
    }
}

impl From<BTreeMap<WeightKey, i32>> for ConfluenceWeights {
    /// Missing keys take their defaults; out-of-range values are clamped
    fn from(values: BTreeMap<WeightKey, i32>) -> Self {
        let mut weights = Self::default();
        for (key, value) in values {
            weights.set(key, value);
        }
        weights
    }
}

impl From<ConfluenceWeights> for BTreeMap<WeightKey, i32> {
    fn from(weights: ConfluenceWeights) -> Self {
        weights.values
    }
}

impl ConfluenceWeights {
    pub fn get(&self, key: WeightKey) -> i32 {
        self.values
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_value())
    }

    /// Store `value` clamped to the key's bounds; returns the stored value
    pub fn set(&mut self, key: WeightKey, value: i32) -> i32 {
        let (min, max) = key.bounds();
        let clamped = value.clamp(min, max);
        if clamped != value {
            log::warn!(
                "[Confluence] Weight {} = {} outside [{}, {}], clamped to {}",
                key,
                value,
                min,
                max,
                clamped
            );
        }
        self.values.insert(key, clamped);
        clamped
    }

    /// Add `delta` to a weight (clamped); returns the stored value
    pub fn adjust(&mut self, key: WeightKey, delta: i32) -> i32 {
        self.set(key, self.get(key).saturating_add(delta))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeightKey, i32)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Scores never go below this
    pub score_floor: i32,
    /// Iceberg size per confluence point
    pub iceberg_size_per_point: Size,
    /// Buy/sell ratio needed for the imbalance bonus
    pub imbalance_min_ratio: Decimal,
    /// Distance from VWAP (ticks) treated as "at VWAP"
    pub vwap_neutral_ticks: Decimal,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            score_floor: -50,
            iceberg_size_per_point: 10,
            imbalance_min_ratio: dec!(1.5),
            vwap_neutral_ticks: dec!(1),
        }
    }
}

/// Per-factor contributions behind a score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub iceberg: i32,
    pub cvd: i32,
    pub divergence: i32,
    pub volume_profile: i32,
    pub imbalance: i32,
    pub ema: i32,
    pub vwap: i32,
    pub time_of_day: i32,
    pub dom: i32,
    pub big_fish: i32,
    pub volume_tail: i32,
    pub tape_speed: i32,
    pub stop_hunt: i32,
    /// Bounded risk quality adjustment folded in after risk synthesis
    pub risk: i32,
    /// Floor applied to the final score
    pub floor: i32,
}

impl ScoreBreakdown {
    /// Sum of all contributions before the floor
    pub fn raw_total(&self) -> i32 {
        self.iceberg
            + self.cvd
            + self.divergence
            + self.volume_profile
            + self.imbalance
            + self.ema
            + self.vwap
            + self.time_of_day
            + self.dom
            + self.big_fish
            + self.volume_tail
            + self.tape_speed
            + self.stop_hunt
            + self.risk
    }

    /// Final score: floored, never capped
    pub fn total(&self) -> i32 {
        self.raw_total().max(self.floor)
    }

    /// Fold in the risk quality adjustment
    pub fn with_risk_adjustment(mut self, adjustment: i32) -> Self {
        self.risk = adjustment;
        self
    }
}

/// Everything the scorer reads for one candidate
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub side: Side,
    pub price: Tick,
    pub size: Size,
    pub now: Timestamp,
    pub phase: SessionPhase,
    pub indicators: &'a IndicatorSuite,
}

#[derive(Debug, Clone, Default)]
pub struct ConfluenceScorer {
    config: ConfluenceConfig,
    weights: ConfluenceWeights,
}

/// +w when `signal` agrees with `side`, -w when it opposes, 0 otherwise
fn directional(signal: Option<Side>, side: Side, agree: i32, oppose: i32) -> i32 {
    match signal {
        Some(s) if s == side => agree,
        Some(_) => -oppose,
        None => 0,
    }
}

impl ConfluenceScorer {
    pub fn new(config: ConfluenceConfig, weights: ConfluenceWeights) -> Self {
        Self { config, weights }
    }

    pub fn weights(&self) -> &ConfluenceWeights {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut ConfluenceWeights {
        &mut self.weights
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    /// Score a candidate; reads engine state, never mutates it
    pub fn score(&self, ctx: &ScoringContext<'_>) -> ScoreBreakdown {
        let w = |key| self.weights.get(key);
        let ind = ctx.indicators;
        let side = ctx.side;

        // Iceberg size, capped by its weight
        let per_point = self.config.iceberg_size_per_point.max(1);
        let iceberg = ((ctx.size / per_point).min(i32::MAX as u64) as i32).min(w(WeightKey::IcebergSize));

        // CVD trend: divergence is penalized harder than alignment is rewarded
        let cvd = match ind.cvd().trend().agrees_with(side) {
            Some(true) => w(WeightKey::CvdAlignment),
            Some(false) => -w(WeightKey::CvdDivergencePenalty),
            None => 0,
        };
        let divergence = match ind.cvd().divergence().side() {
            Some(s) if s == side => w(WeightKey::DivergencePattern),
            _ => 0,
        };

        let volume_profile = if ind.profile().key_level(ctx.price).is_some() {
            w(WeightKey::VolumeProfileNode)
        } else {
            0
        };
        let imbalance =
            if ind.profile().imbalance_favors(side, ctx.price, self.config.imbalance_min_ratio) {
                w(WeightKey::VolumeImbalance)
            } else {
                0
            };

        // EMA: weight × (aligned - opposed) / count; uninitialized EMAs count as neither
        let alignment = ind.emas().alignment(side, ctx.price);
        let ema = if alignment.initialized == 0 || alignment.total == 0 {
            0
        } else {
            w(WeightKey::EmaAlignment) * alignment.net() / alignment.total as i32
        };

        let vwap = match ind.vwap().signed_distance(side, ctx.price) {
            Some(d) if d > self.config.vwap_neutral_ticks => w(WeightKey::VwapAlignment),
            Some(d) if d < -self.config.vwap_neutral_ticks => -w(WeightKey::VwapDivergencePenalty),
            _ => 0,
        };

        let time_of_day = if ctx.phase.is_prime() {
            w(WeightKey::TimeOfDay)
        } else {
            0
        };

        let dom = ind
            .dom()
            .confluence_adjustment(side, ctx.price)
            .clamp(-MAX_DOM_ADJUSTMENT, MAX_DOM_ADJUSTMENT);

        // Microstructure, each bounded by its own weight
        let fish_w = w(WeightKey::BigFish);
        let big_fish = directional(ind.big_fish().signal(ctx.price).side(), side, fish_w, fish_w);

        let tail_w = w(WeightKey::VolumeTail);
        let volume_tail = directional(ind.tails().reading().bias.side(), side, tail_w, tail_w / 2);

        let tape_w = w(WeightKey::TapeSpeed);
        let tape = ind.tape().reading(ctx.now);
        let tape_speed = match tape.condition {
            TapeCondition::Exhaustion => tape_w / 2,
            TapeCondition::Urgency(aggressor) => {
                directional(Some(aggressor.as_side()), side, tape_w, tape_w)
            }
            TapeCondition::Normal => 0,
        };

        let hunt_w = w(WeightKey::StopHunt);
        let stop_hunt = match ind.stop_hunt().signal(ctx.now) {
            Some((s, strength)) => {
                let scaled = hunt_w * strength as i32 / 100;
                directional(Some(s), side, scaled, scaled)
            }
            None => 0,
        }
        .clamp(-hunt_w, hunt_w);

        let breakdown = ScoreBreakdown {
            iceberg,
            cvd,
            divergence,
            volume_profile,
            imbalance,
            ema,
            vwap,
            time_of_day,
            dom,
            big_fish,
            volume_tail,
            tape_speed,
            stop_hunt,
            risk: 0,
            floor: self.config.score_floor,
        };

        log::debug!(
            "[Confluence] {} @ {} size {} -> {} {:?}",
            side,
            ctx.price,
            ctx.size,
            breakdown.total(),
            breakdown
        );
        breakdown
    }
}
