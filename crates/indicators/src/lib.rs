//! Berg Indicator Engines
//!
//! Streaming calculators over one instrument's trade stream:
//! - **CVD**: cumulative volume delta with trend, strength and divergence
//! - **Volume Profile**: POC, value area, local buy/sell imbalance
//! - **EMA / VWAP / ATR**: smoothed price references (bar-driven for EMA/ATR)
//! - **DOM**: resting support/resistance walls from book depth
//! - **Microstructure**: big fish, volume tails, tape speed, stop hunts
//!
//! Every engine is an owned value mutated only through its own `update`
//! call and read through pure accessors. State is session-anchored where
//! it makes sense (CVD, VWAP, profile) and resettable, so replaying the
//! same trades after a reset reproduces the same values exactly.
//!
//! ## Architecture
//!
//! ```text
//! Trade ──► IndicatorSuite ──┬──► BarBuilder ──► ATR, EMA 9/21/50
//!                            ├──► CVD, Volume Profile, VWAP
//!                            └──► Big Fish, Tails, Tape Speed, Stop Hunt
//!
//! Book depth ──► LiquidityAnalyzer (rescan ≥ 1s apart)
//! ```

pub mod atr;
pub mod bar;
pub mod cvd;
pub mod dom;
pub mod ema;
pub mod microstructure;
pub mod suite;
pub mod volume_profile;
pub mod vwap;

// Re-export main types
pub use atr::{Atr, AtrLevel};
pub use bar::{Bar, BarBuilder};
pub use cvd::{CvdConfig, CvdEngine, CvdTrend, Divergence};
pub use dom::{DomConfig, DomSnapshot, LiquidityAnalyzer, LiquidityLevel, MAX_DOM_ADJUSTMENT};
pub use ema::{Ema, EmaAlignment, EmaSet};
pub use microstructure::{
    BigFishConfig, BigFishDetector, BigFishSignal, KeyLevelKind, SpeedLevel, StopHunt,
    StopHuntConfig, StopHuntDetector, Tail, TailBias, TailReading, TapeCondition, TapeReading,
    TapeSpeedConfig, TapeSpeedTracker, VolumeTailConfig, VolumeTailDetector,
};
pub use suite::{IndicatorConfig, IndicatorSuite, IndicatorValues};
pub use volume_profile::{LevelVolume, ProfileLevel, ValueArea, VolumeProfile, VolumeProfileConfig};
pub use vwap::Vwap;
