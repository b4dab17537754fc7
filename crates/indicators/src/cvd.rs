//! Cumulative Volume Delta
//!
//! Running sum of signed trade volume since session start: +size for
//! buy-aggressor prints, -size for sell-aggressor prints. A bounded history
//! of (price, cvd) samples backs the trend, strength and divergence reads.

use berg_core::{Side, Tick, Trade};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Configuration for the CVD engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvdConfig {
    /// Number of recent trades the trend/strength reads cover
    pub trend_window: usize,
    /// Net delta over the trend window needed to call a trend
    pub trend_threshold: i64,
    /// Number of recent trades the divergence check compares
    pub divergence_lookback: usize,
    /// Minimum price move (ticks) for a divergence
    pub divergence_min_price_ticks: i64,
    /// Minimum opposing CVD move for a divergence
    pub divergence_min_delta: i64,
}

impl Default for CvdConfig {
    fn default() -> Self {
        Self {
            trend_window: 50,
            trend_threshold: 100,
            divergence_lookback: 100,
            divergence_min_price_ticks: 4,
            divergence_min_delta: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvdTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl CvdTrend {
    /// Does this trend agree with a signal side? `None` when neutral.
    pub fn agrees_with(&self, side: Side) -> Option<bool> {
        match (self, side) {
            (CvdTrend::Neutral, _) => None,
            (CvdTrend::Bullish, Side::Bid) | (CvdTrend::Bearish, Side::Ask) => Some(true),
            _ => Some(false),
        }
    }
}

/// Price vs CVD divergence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// Price falling while CVD rises
    Bullish,
    /// Price rising while CVD falls
    Bearish,
    None,
}

impl Divergence {
    /// Side this divergence points to, if any
    pub fn side(&self) -> Option<Side> {
        match self {
            Divergence::Bullish => Some(Side::Bid),
            Divergence::Bearish => Some(Side::Ask),
            Divergence::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CvdSample {
    price: Tick,
    delta: i64,
    cvd: i64,
}

/// Streaming CVD engine
#[derive(Debug, Clone)]
pub struct CvdEngine {
    config: CvdConfig,
    cvd: i64,
    history: VecDeque<CvdSample>,
    capacity: usize,
}

impl CvdEngine {
    pub fn new(config: CvdConfig) -> Self {
        let capacity = config.trend_window.max(config.divergence_lookback).max(2);
        Self {
            config,
            cvd: 0,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        let delta = trade.signed_size();
        self.cvd += delta;
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(CvdSample {
            price: trade.price,
            delta,
            cvd: self.cvd,
        });
    }

    /// Session CVD
    pub fn value(&self) -> i64 {
        self.cvd
    }

    fn recent(&self, n: usize) -> impl Iterator<Item = &CvdSample> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    /// Net delta over the trend window
    pub fn recent_delta(&self) -> i64 {
        self.recent(self.config.trend_window).map(|s| s.delta).sum()
    }

    pub fn trend(&self) -> CvdTrend {
        let net = self.recent_delta();
        if net >= self.config.trend_threshold {
            CvdTrend::Bullish
        } else if net <= -self.config.trend_threshold {
            CvdTrend::Bearish
        } else {
            CvdTrend::Neutral
        }
    }

    /// 0-100: how one-sided the recent flow is
    pub fn strength(&self) -> u8 {
        let (net, gross) = self
            .recent(self.config.trend_window)
            .fold((0i64, 0i64), |(net, gross), s| (net + s.delta, gross + s.delta.abs()));
        if gross == 0 {
            return 0;
        }
        (net.abs() * 100 / gross).clamp(0, 100) as u8
    }

    /// Compare price slope against CVD slope over the lookback
    pub fn divergence(&self) -> Divergence {
        let lookback = self.config.divergence_lookback.max(2);
        let mut window = self.recent(lookback);
        let (Some(first), Some(last)) = (window.next(), self.history.back()) else {
            return Divergence::None;
        };
        if self.history.len() < 2 {
            return Divergence::None;
        }
        let price_change = last.price - first.price;
        let cvd_change = last.cvd - first.cvd;
        let min_price = self.config.divergence_min_price_ticks;
        let min_delta = self.config.divergence_min_delta;

        if price_change >= min_price && cvd_change <= -min_delta {
            Divergence::Bearish
        } else if price_change <= -min_price && cvd_change >= min_delta {
            Divergence::Bullish
        } else {
            Divergence::None
        }
    }

    /// Start a new session
    pub fn reset(&mut self) {
        self.cvd = 0;
        self.history.clear();
    }
}
