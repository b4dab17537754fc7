//! Average True Range (Wilder's smoothing)
//!
//! `TR = max(H-L, |H-prevC|, |L-prevC|)`. The first ATR is the simple
//! average of the first `period` true ranges, after which
//! `ATR = (ATR_prev × (period-1) + TR) / period`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::bar::Bar;

/// ATR relative to its own recent baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrLevel {
    Low,
    Normal,
    High,
    Extreme,
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<i64>,
    seed: Vec<Decimal>,
    value: Option<Decimal>,
    /// Recent ATR values, used as the baseline for `level`
    history: VecDeque<Decimal>,
    baseline_window: usize,
}

impl Atr {
    /// Create an ATR; a zero period is treated as 1
    pub fn new(period: usize, baseline_window: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            prev_close: None,
            seed: Vec::with_capacity(period),
            value: None,
            history: VecDeque::with_capacity(baseline_window.max(1)),
            baseline_window: baseline_window.max(1),
        }
    }

    fn true_range(&self, bar: &Bar) -> Decimal {
        let hl = bar.high - bar.low;
        let tr = match self.prev_close {
            Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
            None => hl,
        };
        Decimal::from(tr)
    }

    /// Feed a closed bar
    pub fn update(&mut self, bar: &Bar) -> Option<Decimal> {
        let tr = self.true_range(bar);
        self.prev_close = Some(bar.close);

        let period = Decimal::from(self.period as u64);
        match self.value {
            Some(prev) => {
                self.value = Some((prev * (period - Decimal::ONE) + tr) / period);
            }
            None => {
                self.seed.push(tr);
                if self.seed.len() >= self.period {
                    let sum: Decimal = self.seed.iter().copied().sum();
                    self.value = Some(sum / period);
                    self.seed.clear();
                }
            }
        }

        if let Some(value) = self.value {
            if self.history.len() == self.baseline_window {
                self.history.pop_front();
            }
            self.history.push_back(value);
        }
        self.value
    }

    /// Current ATR in ticks
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    /// Mean of recent ATR values
    pub fn baseline(&self) -> Option<Decimal> {
        if self.history.is_empty() {
            return None;
        }
        let sum: Decimal = self.history.iter().copied().sum();
        Some(sum / Decimal::from(self.history.len() as u64))
    }

    /// Classify the current ATR against its baseline
    ///
    /// `multiplier` is the ratio above which volatility counts as high;
    /// 1.5× that is extreme, and below `1 / multiplier` is low.
    pub fn level(&self, multiplier: Decimal) -> Option<AtrLevel> {
        let value = self.value?;
        let baseline = self.baseline()?;
        if baseline.is_zero() || multiplier <= Decimal::ONE {
            return Some(AtrLevel::Normal);
        }
        let ratio = value / baseline;
        let level = if ratio >= multiplier * Decimal::new(15, 1) {
            AtrLevel::Extreme
        } else if ratio >= multiplier {
            AtrLevel::High
        } else if ratio <= Decimal::ONE / multiplier {
            AtrLevel::Low
        } else {
            AtrLevel::Normal
        };
        Some(level)
    }

    pub fn reset(&mut self) {
        self.prev_close = None;
        self.seed.clear();
        self.value = None;
        self.history.clear();
    }
}
