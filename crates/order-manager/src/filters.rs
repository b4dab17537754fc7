//! Pre-filters applied before a signal reaches the decision service
//!
//! Checked in order: score floor, counter-trend CVD, duplicate
//! (side, price) within the dedup window, position capacity. The first
//! failure discards the candidate.

use berg_core::{Side, Tick, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum FilterRejection {
    ScoreBelowFloor { score: i32, floor: i32 },
    CounterTrend { side: Side, cvd: i64, threshold: i64 },
    Duplicate { side: Side, price: Tick, age_ms: i64 },
    AtCapacity { open: usize, max: usize },
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRejection::ScoreBelowFloor { score, floor } => {
                write!(f, "score {} below floor {}", score, floor)
            }
            FilterRejection::CounterTrend {
                side,
                cvd,
                threshold,
            } => write!(f, "{} signal against CVD {} (limit {})", side, cvd, threshold),
            FilterRejection::Duplicate {
                side,
                price,
                age_ms,
            } => write!(f, "duplicate {} @ {} dispatched {} ms ago", side, price, age_ms),
            FilterRejection::AtCapacity { open, max } => {
                write!(f, "{} open positions (max {})", open, max)
            }
        }
    }
}

/// Score must reach `decision_threshold - offset`
pub fn check_score_floor(score: i32, decision_threshold: i32, offset: i32) -> Result<(), FilterRejection> {
    let floor = decision_threshold.saturating_sub(offset);
    if score < floor {
        return Err(FilterRejection::ScoreBelowFloor { score, floor });
    }
    Ok(())
}

/// Reject when session CVD opposes the signal by more than `threshold`
pub fn check_counter_trend(side: Side, cvd: i64, threshold: i64) -> Result<(), FilterRejection> {
    let opposing = -cvd * side.sign();
    if opposing > threshold {
        return Err(FilterRejection::CounterTrend {
            side,
            cvd,
            threshold,
        });
    }
    Ok(())
}

pub fn check_capacity(open: usize, max: usize) -> Result<(), FilterRejection> {
    if open >= max {
        return Err(FilterRejection::AtCapacity { open, max });
    }
    Ok(())
}

/// Recently dispatched (side, price) pairs
///
/// Entries older than twice the window are pruned on every record.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    window: Duration,
    entries: HashMap<(Side, Tick), Timestamp>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn check(&self, side: Side, price: Tick, now: Timestamp) -> Result<(), FilterRejection> {
        match self.entries.get(&(side, price)) {
            Some(at) if now - *at < self.window => Err(FilterRejection::Duplicate {
                side,
                price,
                age_ms: (now - *at).num_milliseconds(),
            }),
            _ => Ok(()),
        }
    }

    pub fn record(&mut self, side: Side, price: Tick, now: Timestamp) {
        self.entries.insert((side, price), now);
        self.prune(now);
    }

    pub fn prune(&mut self, now: Timestamp) {
        let horizon = self.window * 2;
        self.entries.retain(|_, at| now - *at <= horizon);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
