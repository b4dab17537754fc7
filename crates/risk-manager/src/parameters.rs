//! Risk Parameters
//!
//! Configuration for stop/target synthesis and the annotated result handed
//! to the decision service. A poor reward:risk never turns into an error:
//! it is reported through `RiskQuality` and folded into the score.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stop/target synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fallback stop when no other candidate exists
    pub fixed_stop_ticks: i64,
    /// Fallback target
    pub fixed_target_ticks: i64,
    pub atr_stop_multiplier: Decimal,
    pub atr_target_multiplier: Decimal,
    /// Minimum target / stop
    pub min_reward_risk: Decimal,
    /// Targets within this fraction of the required distance are nudged up
    pub ratio_tolerance: Decimal,
    /// Resting size a DOM level needs before it anchors a stop or target
    pub dom_min_volume: u64,
    /// Prefer a qualifying DOM stop over the widest candidate
    pub dom_priority: bool,
    /// Ticks beyond a DOM wall to place the stop
    pub dom_buffer_ticks: i64,
    /// Trade memory length
    pub memory_trades: usize,
    /// Outcomes needed before memory produces a candidate
    pub memory_min_trades: usize,
    pub max_stop_ticks: i64,
    pub max_target_ticks: i64,
    pub min_stop_ticks: i64,
    /// Scale ATR distances by session phase
    pub session_scaling: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            fixed_stop_ticks: 8,
            fixed_target_ticks: 16,
            atr_stop_multiplier: dec!(1.5),
            atr_target_multiplier: dec!(3.0),
            min_reward_risk: dec!(1.5),
            ratio_tolerance: dec!(0.95),
            dom_min_volume: 50,
            dom_priority: true,
            dom_buffer_ticks: 2,
            memory_trades: 20,
            memory_min_trades: 5,
            max_stop_ticks: 40,
            max_target_ticks: 120,
            min_stop_ticks: 4,
            session_scaling: true,
        }
    }
}

/// Where a stop or target distance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegSource {
    Atr,
    Dom,
    Memory,
    Fixed,
    /// Set to exactly meet the minimum reward:risk
    RatioAdjusted,
}

impl fmt::Display for LegSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegSource::Atr => write!(f, "ATR"),
            LegSource::Dom => write!(f, "DOM"),
            LegSource::Memory => write!(f, "MEMORY"),
            LegSource::Fixed => write!(f, "FIXED"),
            LegSource::RatioAdjusted => write!(f, "RATIO_ADJUSTED"),
        }
    }
}

/// One source's proposed distances (ticks from entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCandidate {
    pub source: LegSource,
    pub stop_ticks: Option<i64>,
    pub target_ticks: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskIssue {
    None,
    /// Target was raised to meet the minimum ratio
    ForcedTarget,
    /// Widest stop exceeded the maximum and was capped
    StopCapped,
    /// Minimum ratio unreachable within the target cap
    PoorRewardRisk,
}

/// Stop/target that would satisfy the constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovedLevels {
    pub stop_ticks: i64,
    pub target_ticks: i64,
}

/// Soft-filter annotation carried alongside the numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskQuality {
    pub issue: RiskIssue,
    pub explanation: String,
    pub improvement_feasible: bool,
    pub improved: Option<ImprovedLevels>,
    /// Bounded adjustment folded into the confluence score
    pub score_adjustment: i32,
}

/// Range of `RiskQuality::score_adjustment`
pub const MIN_SCORE_ADJUSTMENT: i32 = -15;
pub const MAX_SCORE_ADJUSTMENT: i32 = 5;

/// Synthesized stop/target with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub stop_ticks: i64,
    pub target_ticks: i64,
    /// target / stop
    pub reward_risk: Decimal,
    /// Ratio meets the minimum
    pub accepted: bool,
    pub stop_source: LegSource,
    pub target_source: LegSource,
    /// Target was moved off its source value to meet the ratio
    pub force_adjusted: bool,
    pub quality: RiskQuality,
    /// Every candidate considered
    pub candidates: Vec<RiskCandidate>,
}

impl RiskParameters {
    pub fn score_adjustment(&self) -> i32 {
        self.quality.score_adjustment
    }
}
