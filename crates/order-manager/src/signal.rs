//! Signal - A scored iceberg candidate that passed the pre-filters
//!
//! Created at dispatch time with its score breakdown and risk parameters,
//! then followed by the Outcome Tracker until price moves far enough (or
//! long enough) to call it.

use berg_core::{Side, Size, Tick, Timestamp};
use berg_risk_manager::RiskParameters;
use berg_strategy::ScoreBreakdown;
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub type SignalId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Open,
    Profitable,
    Unprofitable,
    TimedOut,
}

impl SignalStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SignalStatus::Open)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub timestamp: Timestamp,
    pub side: Side,
    pub entry_price: Tick,
    /// Aggregate resting size when the iceberg fired
    pub total_size: Size,
    /// Final score: confluence plus risk adjustment, floored
    pub score: i32,
    pub score_breakdown: ScoreBreakdown,
    pub risk: RiskParameters,
    pub status: SignalStatus,
    /// Maximum favourable excursion while open (ticks)
    pub mfe_ticks: i64,
    /// Maximum adverse excursion while open (ticks, positive)
    pub mae_ticks: i64,
    pub exit_price: Option<Tick>,
    pub exit_time: Option<Timestamp>,
}

impl Signal {
    /// Create an open signal; the score is taken from the breakdown
    pub fn new(
        id: SignalId,
        timestamp: Timestamp,
        side: Side,
        entry_price: Tick,
        total_size: Size,
        score_breakdown: ScoreBreakdown,
        risk: RiskParameters,
    ) -> Self {
        Self {
            id,
            timestamp,
            side,
            entry_price,
            total_size,
            score: score_breakdown.total(),
            score_breakdown,
            risk,
            status: SignalStatus::Open,
            mfe_ticks: 0,
            mae_ticks: 0,
            exit_price: None,
            exit_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SignalStatus::Open
    }

    /// Ticks in this signal's favour at `price`
    pub fn favorable_ticks(&self, price: Tick) -> i64 {
        self.side.favorable_ticks(self.entry_price, price)
    }

    /// Track excursions at a new price; returns the favourable move
    pub fn observe(&mut self, price: Tick) -> i64 {
        let moved = self.favorable_ticks(price);
        self.mfe_ticks = self.mfe_ticks.max(moved);
        self.mae_ticks = self.mae_ticks.max(-moved);
        moved
    }

    pub fn resolve(&mut self, status: SignalStatus, exit_price: Tick, exit_time: Timestamp) {
        self.status = status;
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
    }

    /// Time from signal to exit, once resolved
    pub fn elapsed(&self) -> Option<Duration> {
        self.exit_time.map(|t| t - self.timestamp)
    }
}
