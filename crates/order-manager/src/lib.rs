//! Berg Order Manager
//!
//! Everything that happens to a candidate after it has been scored:
//! - **Pre-filters**: score floor, counter-trend CVD, de-duplication, capacity
//! - **Single-flight dispatch**: at most one outstanding decision call
//! - **Decision routing**: take/skip to the execution sink, adjustments back
//!   to the event thread
//! - **Outcome tracking**: excursions and resolution of dispatched signals
//!
//! ## Architecture
//!
//! ```text
//! Signal + SessionContext
//!          │
//!          ▼
//! ┌──────────────────────────────────────────────┐
//! │            DecisionOrchestrator              │
//! │  WarmupGate ─► filters ─► Semaphore(1)       │
//! │                              │ spawn         │
//! │                              ▼               │
//! │                 timeout(DecisionService)     │
//! └──────────────────────────────┬───────────────┘
//!                                │
//!           ┌────────────────────┴──────────────┐
//!           ▼                                   ▼
//!     ExecutionSink                  mpsc<DecisionEvent>
//!   (take/skip decision)          (adjustments, failures)
//!
//! Trades ──► OutcomeTracker ──► ResolvedOutcome ──► TradeMemory
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use berg_order_manager::{DecisionOrchestrator, OrchestratorConfig};
//!
//! let (mut orchestrator, mut events) =
//!     DecisionOrchestrator::new(OrchestratorConfig::default(), service, sink);
//!
//! match orchestrator.submit(signal, context) {
//!     DispatchOutcome::Dispatched(id) => log::info!("sent {}", id),
//!     other => log::debug!("not sent: {:?}", other),
//! }
//!
//! while let Ok(event) = events.try_recv() {
//!     // apply adjustments on the event thread
//! }
//! ```

pub mod decision;
pub mod error;
pub mod filters;
pub mod orchestrator;
pub mod outcome;
pub mod signal;

// Re-export main types
pub use decision::{
    Decision, DecisionAction, DecisionEvent, DecisionRequest, DecisionService, ExecutionSink,
    SessionContext, ThresholdAdjustment, TradeDecision, WeightAdjustment,
};
pub use error::{Error, Result};
pub use filters::{DedupWindow, FilterRejection};
pub use orchestrator::{
    DecisionOrchestrator, DispatchOutcome, OrchestratorConfig, OrchestratorStats, WarmupGate,
};
pub use outcome::{OutcomeConfig, OutcomeStats, OutcomeTracker, ResolvedOutcome};
pub use signal::{Signal, SignalId, SignalStatus};
