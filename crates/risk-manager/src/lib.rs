//! Berg Risk Manager
//!
//! Stop-loss / take-profit synthesis for iceberg signals. Three sources of
//! distance are blended under a minimum reward:risk constraint:
//!
//! - **ATR**: volatility-scaled, optionally widened at the open and close
//!   and tightened at midday
//! - **DOM**: nearest resting walls with enough size behind them
//! - **Memory**: average excursions of recently resolved signals
//!
//! ## Soft filter
//!
//! A setup that cannot reach the minimum ratio is not rejected. The result
//! carries a `RiskQuality` (issue, explanation, feasible improvement) and a
//! bounded score adjustment so the decision service still sees the full
//! picture.
//!
//! ```text
//! ATR ────┐
//! DOM ────┼──► RiskCalculator ──► RiskParameters { stop, target, R:R,
//! Memory ─┘                                        sources, quality }
//! ```

pub mod calculator;
pub mod memory;
pub mod parameters;

// Re-export main types
pub use calculator::{RiskCalculator, RiskInputs};
pub use memory::{TradeExcursion, TradeMemory};
pub use parameters::{
    ImprovedLevels, LegSource, RiskCandidate, RiskConfig, RiskIssue, RiskParameters, RiskQuality,
};
