//! Iceberg Detector
//!
//! Per-price state machine over aggregated book levels:
//!
//! ```text
//! BelowThreshold ──(count ≥ T_count AND size ≥ T_size)──► Armed
//! Armed ──(price cooldown AND global cooldown elapsed)──► Fired
//! ```
//!
//! Firing emits a candidate and restarts both the per-price timer and the
//! global timer shared by all prices. "Iceberg" is a heuristic over
//! replenished volume at a price; it says nothing about who placed the
//! orders.

use berg_core::{Side, Size, Tick, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::orderbook::LevelStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IcebergConfig {
    /// Minimum time between firings at the same price
    pub price_cooldown_ms: i64,
    /// Minimum time between firings at any price
    pub global_cooldown_ms: i64,
    /// Tracked prices above which idle entries are pruned
    pub max_tracked_levels: usize,
}

impl Default for IcebergConfig {
    fn default() -> Self {
        Self {
            price_cooldown_ms: 10_000,
            global_cooldown_ms: 2_000,
            max_tracked_levels: 4_096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    BelowThreshold,
    /// Thresholds met, waiting on a cooldown
    Armed,
    Fired,
}

/// A level that just fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebergCandidate {
    pub side: Side,
    pub price: Tick,
    pub total_size: Size,
    pub order_count: usize,
    pub detected_at: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct LevelTrack {
    state: LevelState,
    last_fired: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct IcebergDetector {
    config: IcebergConfig,
    levels: HashMap<Tick, LevelTrack>,
    last_global_fire: Option<Timestamp>,
    fired: u64,
}

impl IcebergDetector {
    pub fn new(config: IcebergConfig) -> Self {
        Self {
            config,
            levels: HashMap::new(),
            last_global_fire: None,
            fired: 0,
        }
    }

    fn elapsed(since: Option<Timestamp>, now: Timestamp, cooldown_ms: i64) -> bool {
        since.is_none_or(|t| now - t >= Duration::milliseconds(cooldown_ms))
    }

    /// Evaluate one level against the current thresholds
    ///
    /// `now` must be data-time from the feed.
    pub fn evaluate(
        &mut self,
        level: &LevelStats,
        thresholds: (usize, Size),
        now: Timestamp,
    ) -> Option<IcebergCandidate> {
        if self.levels.len() > self.config.max_tracked_levels {
            self.prune(now);
        }

        let (min_orders, min_size) = thresholds;
        let meets = level.order_count >= min_orders && level.total_size >= min_size;

        let track = self.levels.entry(level.price).or_insert(LevelTrack {
            state: LevelState::BelowThreshold,
            last_fired: None,
        });

        if !meets {
            track.state = LevelState::BelowThreshold;
            return None;
        }

        let price_ready = Self::elapsed(track.last_fired, now, self.config.price_cooldown_ms);
        let global_ready = Self::elapsed(self.last_global_fire, now, self.config.global_cooldown_ms);

        if !(price_ready && global_ready) {
            if track.state != LevelState::Armed {
                log::debug!(
                    "[Iceberg] {} {} armed ({} orders / {}) but cooling down (price_ready={}, global_ready={})",
                    level.side,
                    level.price,
                    level.order_count,
                    level.total_size,
                    price_ready,
                    global_ready
                );
            }
            track.state = LevelState::Armed;
            return None;
        }

        track.state = LevelState::Fired;
        track.last_fired = Some(now);
        self.last_global_fire = Some(now);
        self.fired += 1;

        log::info!(
            "[Iceberg] FIRED {} @ {}: {} orders, size {} (thresholds {} / {})",
            level.side,
            level.price,
            level.order_count,
            level.total_size,
            min_orders,
            min_size
        );

        Some(IcebergCandidate {
            side: level.side,
            price: level.price,
            total_size: level.total_size,
            order_count: level.order_count,
            detected_at: now,
        })
    }

    /// Drop prices that are below threshold and out of their cooldown
    pub fn prune(&mut self, now: Timestamp) {
        let cooldown = self.config.price_cooldown_ms;
        self.levels.retain(|_, track| {
            track.state == LevelState::Armed || !Self::elapsed(track.last_fired, now, cooldown)
        });
    }

    pub fn state(&self, price: Tick) -> LevelState {
        self.levels
            .get(&price)
            .map(|t| t.state)
            .unwrap_or(LevelState::BelowThreshold)
    }

    pub fn last_fired(&self, price: Tick) -> Option<Timestamp> {
        self.levels.get(&price).and_then(|t| t.last_fired)
    }

    /// Total firings since construction
    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}
