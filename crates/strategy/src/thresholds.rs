//! Adaptive Threshold Engine
//!
//! Keeps ring buffers of the order count and aggregate size seen at the
//! level of every added order. In adaptive mode the iceberg thresholds
//! follow the rolling averages; in static mode they stay at the configured
//! values and the buffers are kept for reporting only.

use berg_core::Size;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::orderbook::LevelStats;

/// Thresholds never drop below these, whatever the statistics say
pub const HARD_MIN_ORDER_COUNT: usize = 5;
pub const HARD_MIN_SIZE: Size = 20;
/// Upper bounds for externally requested thresholds
pub const MAX_ORDER_COUNT: usize = 1_000;
pub const MAX_SIZE: Size = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Follow rolling statistics instead of the static values
    pub adaptive: bool,
    /// Ring buffer length
    pub window: usize,
    /// Static threshold, and the floor in adaptive mode
    pub order_count_threshold: usize,
    /// Static threshold, and the floor in adaptive mode
    pub size_threshold: Size,
    pub order_count_multiplier: Decimal,
    pub size_multiplier: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            window: 100,
            order_count_threshold: 25,
            size_threshold: 100,
            order_count_multiplier: dec!(2.0),
            size_multiplier: dec!(2.0),
        }
    }
}

/// Current thresholds plus the statistics behind them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub adaptive: bool,
    pub order_count_threshold: usize,
    pub size_threshold: Size,
    pub avg_order_count: Option<Decimal>,
    pub avg_size: Option<Decimal>,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct AdaptiveThresholds {
    config: ThresholdConfig,
    order_counts: VecDeque<usize>,
    sizes: VecDeque<Size>,
    sum_order_counts: u64,
    sum_sizes: u64,
    order_count_threshold: usize,
    size_threshold: Size,
}

impl AdaptiveThresholds {
    pub fn new(config: ThresholdConfig) -> Self {
        let window = config.window.max(1);
        let order_count_threshold = config.order_count_threshold.max(HARD_MIN_ORDER_COUNT);
        let size_threshold = config.size_threshold.max(HARD_MIN_SIZE);
        Self {
            config,
            order_counts: VecDeque::with_capacity(window),
            sizes: VecDeque::with_capacity(window),
            sum_order_counts: 0,
            sum_sizes: 0,
            order_count_threshold,
            size_threshold,
        }
    }

    /// Record the level an order was just added to
    pub fn observe(&mut self, level: &LevelStats) {
        let window = self.config.window.max(1);
        self.order_counts.push_back(level.order_count);
        self.sizes.push_back(level.total_size);
        self.sum_order_counts += level.order_count as u64;
        self.sum_sizes += level.total_size;
        while self.order_counts.len() > window {
            if let Some(evicted) = self.order_counts.pop_front() {
                self.sum_order_counts -= evicted as u64;
            }
        }
        while self.sizes.len() > window {
            if let Some(evicted) = self.sizes.pop_front() {
                self.sum_sizes -= evicted;
            }
        }

        if self.config.adaptive {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        if let Some(avg) = self.avg_order_count() {
            let scaled = (avg * self.config.order_count_multiplier)
                .ceil()
                .to_usize()
                .unwrap_or(usize::MAX);
            self.order_count_threshold = scaled
                .max(self.config.order_count_threshold)
                .max(HARD_MIN_ORDER_COUNT);
        }
        if let Some(avg) = self.avg_size() {
            let scaled = (avg * self.config.size_multiplier)
                .ceil()
                .to_u64()
                .unwrap_or(u64::MAX);
            self.size_threshold = scaled.max(self.config.size_threshold).max(HARD_MIN_SIZE);
        }
    }

    pub fn avg_order_count(&self) -> Option<Decimal> {
        if self.order_counts.is_empty() {
            return None;
        }
        Some(Decimal::from(self.sum_order_counts) / Decimal::from(self.order_counts.len() as u64))
    }

    pub fn avg_size(&self) -> Option<Decimal> {
        if self.sizes.is_empty() {
            return None;
        }
        Some(Decimal::from(self.sum_sizes) / Decimal::from(self.sizes.len() as u64))
    }

    /// (order count, size) a level must reach to arm
    pub fn current(&self) -> (usize, Size) {
        (self.order_count_threshold, self.size_threshold)
    }

    pub fn is_adaptive(&self) -> bool {
        self.config.adaptive
    }

    /// Switch adaptive mode at runtime
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.config.adaptive = adaptive;
        if adaptive {
            self.recompute();
        } else {
            self.order_count_threshold = self.config.order_count_threshold.max(HARD_MIN_ORDER_COUNT);
            self.size_threshold = self.config.size_threshold.max(HARD_MIN_SIZE);
        }
    }

    /// Change the configured thresholds, clamped to safety bounds
    ///
    /// Returns the values actually stored.
    pub fn set_static_thresholds(
        &mut self,
        order_count: Option<usize>,
        size: Option<Size>,
    ) -> (usize, Size) {
        if let Some(requested) = order_count {
            let clamped = requested.clamp(HARD_MIN_ORDER_COUNT, MAX_ORDER_COUNT);
            if clamped != requested {
                log::warn!(
                    "[Thresholds] Order count threshold {} clamped to {}",
                    requested,
                    clamped
                );
            }
            self.config.order_count_threshold = clamped;
        }
        if let Some(requested) = size {
            let clamped = requested.clamp(HARD_MIN_SIZE, MAX_SIZE);
            if clamped != requested {
                log::warn!("[Thresholds] Size threshold {} clamped to {}", requested, clamped);
            }
            self.config.size_threshold = clamped;
        }

        self.set_adaptive(self.config.adaptive);
        log::info!(
            "[Thresholds] Configured thresholds now orders={} size={} (active {:?})",
            self.config.order_count_threshold,
            self.config.size_threshold,
            self.current()
        );
        (self.config.order_count_threshold, self.config.size_threshold)
    }

    /// Apply a suggested threshold change from the decision service
    ///
    /// In adaptive mode the new values act as floors under the learned
    /// thresholds; in static mode they replace them.
    pub fn apply_adjustment(&mut self, order_count: Option<usize>, size: Option<Size>) -> (usize, Size) {
        if order_count.is_none() && size.is_none() {
            return self.current();
        }
        log::info!(
            "[Thresholds] Adjustment requested: orders={:?} size={:?}",
            order_count,
            size
        );
        self.set_static_thresholds(order_count, size);
        self.current()
    }

    pub fn snapshot(&self) -> ThresholdSnapshot {
        ThresholdSnapshot {
            adaptive: self.config.adaptive,
            order_count_threshold: self.order_count_threshold,
            size_threshold: self.size_threshold,
            avg_order_count: self.avg_order_count(),
            avg_size: self.avg_size(),
            samples: self.order_counts.len(),
        }
    }
}
