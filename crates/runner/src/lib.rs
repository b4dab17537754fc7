//! Berg Runner - Iceberg signal pipeline host
//!
//! Hosts the full pipeline for one instrument:
//!
//! - **Config**: one JSON document with a section per component
//! - **Pipeline**: the market data handler that drives every engine
//! - **Feed**: JSON-lines replay of recorded feed events
//! - **Local**: a score-threshold decision service and a logging sink
//!
//! ## Architecture
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │   JSON-lines    │
//!                  │   FeedEvents    │
//!                  └────────┬────────┘
//!                           │ handle(event)
//!                           ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SignalPipeline                       │
//! │                                                         │
//! │  DataClock ─► IcebergEngine ─► ConfluenceScorer         │
//! │               IndicatorSuite ─► RiskCalculator          │
//! │                                      │ Signal           │
//! │                       DecisionOrchestrator              │
//! │                                      │                  │
//! │               OutcomeTracker ◄───────┘                  │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ TradeDecision
//!                            ▼
//!               ┌───────────────────────┐
//!               │     ExecutionSink     │
//!               └───────────────────────┘
//! ```

pub mod config;
pub mod feed;
pub mod local;
pub mod pipeline;

// Re-export main types
pub use config::{ConfigError, ConfigWarning, EngineConfig};
pub use feed::{FeedError, JsonLinesFeed};
pub use local::{LoggingSink, ScoreThresholdService};
pub use pipeline::{PipelineSnapshot, PipelineStats, SignalPipeline};

// Re-export the feed contract for convenience
pub use berg_core::FeedEvent;
pub use berg_ports::MarketDataHandler;
