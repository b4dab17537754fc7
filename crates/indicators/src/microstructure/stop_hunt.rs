//! Stop Hunt Detector
//!
//! Watches key levels (VWAP, range extremes, value area edges) for a quick
//! push through the level that reverses back across it within a short
//! window: resting stops beyond the level were run and the move failed.
//! A hunt above a level is bearish, a hunt below it is bullish.

use berg_core::{Side, Tick, Timestamp, Trade};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyLevelKind {
    Vwap,
    RangeHigh,
    RangeLow,
    ValueAreaHigh,
    ValueAreaLow,
    Poc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopHuntConfig {
    /// Minimum excursion beyond the level to count as a breach
    pub min_penetration_ticks: i64,
    /// Excursions further than this are breakouts, not hunts
    pub max_penetration_ticks: i64,
    /// Time allowed for price to come back across the level
    pub reversal_window_ms: i64,
    /// Ticks back on the original side needed to confirm the reversal
    pub reclaim_ticks: i64,
    /// Signal strength decays to zero over this period
    pub decay_ms: i64,
}

impl Default for StopHuntConfig {
    fn default() -> Self {
        Self {
            min_penetration_ticks: 2,
            max_penetration_ticks: 12,
            reversal_window_ms: 15_000,
            reclaim_ticks: 1,
            decay_ms: 120_000,
        }
    }
}

/// A confirmed stop hunt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopHunt {
    pub kind: KeyLevelKind,
    pub level: Tick,
    /// Direction the hunt points to
    pub side: Side,
    pub penetration_ticks: i64,
    pub detected_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy)]
struct Breach {
    /// Side of the level price came from
    origin: Position,
    started_at: Timestamp,
    penetration: i64,
}

#[derive(Debug, Clone)]
struct LevelWatch {
    kind: KeyLevelKind,
    price: Tick,
    position: Option<Position>,
    breach: Option<Breach>,
}

#[derive(Debug, Clone)]
pub struct StopHuntDetector {
    config: StopHuntConfig,
    levels: Vec<LevelWatch>,
    last_hunt: Option<StopHunt>,
}

impl StopHuntDetector {
    pub fn new(config: StopHuntConfig) -> Self {
        Self {
            config,
            levels: Vec::new(),
            last_hunt: None,
        }
    }

    /// Set or move a key level
    ///
    /// A level with a breach in progress keeps its price until the breach
    /// resolves.
    pub fn set_level(&mut self, kind: KeyLevelKind, price: Tick) {
        match self.levels.iter_mut().find(|w| w.kind == kind) {
            Some(watch) if watch.breach.is_none() => watch.price = price,
            Some(_) => {}
            None => self.levels.push(LevelWatch {
                kind,
                price,
                position: None,
                breach: None,
            }),
        }
    }

    pub fn update(&mut self, trade: &Trade) {
        let p = trade.price;
        let now = trade.timestamp;
        let cfg = &self.config;

        for watch in &mut self.levels {
            if let Some(breach) = &mut watch.breach {
                let origin = breach.origin;
                let beyond = match origin {
                    Position::Below => p - watch.price,
                    Position::Above => watch.price - p,
                };
                breach.penetration = breach.penetration.max(beyond);

                if breach.penetration > cfg.max_penetration_ticks
                    || now - breach.started_at > Duration::milliseconds(cfg.reversal_window_ms)
                {
                    // Accepted on the other side
                    watch.breach = None;
                    watch.position = Some(match origin {
                        Position::Below => Position::Above,
                        Position::Above => Position::Below,
                    });
                } else if -beyond >= cfg.reclaim_ticks {
                    let side = match origin {
                        Position::Below => Side::Ask,
                        Position::Above => Side::Bid,
                    };
                    let hunt = StopHunt {
                        kind: watch.kind,
                        level: watch.price,
                        side,
                        penetration_ticks: breach.penetration,
                        detected_at: now,
                    };
                    log::info!(
                        "[StopHunt] {:?} @ {} hunted by {} ticks, signal {}",
                        hunt.kind,
                        hunt.level,
                        hunt.penetration_ticks,
                        hunt.side
                    );
                    self.last_hunt = Some(hunt);
                    watch.breach = None;
                }
                continue;
            }

            match watch.position {
                Some(Position::Below) if p - watch.price >= cfg.min_penetration_ticks => {
                    watch.breach = Some(Breach {
                        origin: Position::Below,
                        started_at: now,
                        penetration: p - watch.price,
                    });
                }
                Some(Position::Above) if watch.price - p >= cfg.min_penetration_ticks => {
                    watch.breach = Some(Breach {
                        origin: Position::Above,
                        started_at: now,
                        penetration: watch.price - p,
                    });
                }
                _ => {
                    if p < watch.price {
                        watch.position = Some(Position::Below);
                    } else if p > watch.price {
                        watch.position = Some(Position::Above);
                    }
                }
            }
        }
    }

    pub fn last_hunt(&self) -> Option<&StopHunt> {
        self.last_hunt.as_ref()
    }

    /// Direction and 0-100 strength of the most recent hunt, decayed by age
    pub fn signal(&self, now: Timestamp) -> Option<(Side, u8)> {
        let hunt = self.last_hunt?;
        let age = (now - hunt.detected_at).num_milliseconds().max(0);
        let decay = self.config.decay_ms.max(1);
        if age >= decay {
            return None;
        }
        let base = (40 + hunt.penetration_ticks * 5).min(100);
        let strength = base * (decay - age) / decay;
        if strength <= 0 {
            return None;
        }
        Some((hunt.side, strength as u8))
    }

    pub fn reset(&mut self) {
        self.levels.clear();
        self.last_hunt = None;
    }
}
