//! Berg Strategy
//!
//! Turns the order event stream into scored iceberg candidates:
//! - Market-by-order book aggregation per price level
//! - Adaptive (or static) detection thresholds from rolling level statistics
//! - Iceberg state machine with per-price and global cooldowns
//! - Table-driven confluence scoring over the indicator suite
//!
//! ## Architecture
//!
//! ```text
//! Order add/replace/cancel ──► OrderBookAggregator ──► AdaptiveThresholds
//!                                      │ touched levels
//!                  BookUpdate ─────────▼
//!                               IcebergDetector ──► IcebergCandidate
//!                                                          │
//!                     IndicatorSuite ──► ConfluenceScorer ◄┘
//!                                              │
//!                                              ▼
//!                                        ScoreBreakdown
//! ```

pub mod confluence;
pub mod engine;
pub mod iceberg;
pub mod orderbook;
pub mod thresholds;

// Re-export main types
pub use confluence::{
    ConfluenceConfig, ConfluenceScorer, ConfluenceWeights, ScoreBreakdown, ScoringContext,
    WeightKey,
};
pub use engine::IcebergEngine;
pub use iceberg::{IcebergCandidate, IcebergConfig, IcebergDetector, LevelState};
pub use orderbook::{LevelStats, OrderBookAggregator, PriceLevel};
pub use thresholds::{AdaptiveThresholds, ThresholdConfig, ThresholdSnapshot};
