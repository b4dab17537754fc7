//! Signal Decision Orchestrator
//!
//! ```text
//! candidate ──► warm-up gate ──► pre-filters ──► single-flight ──► dispatched ──► resolved
//! ```
//!
//! The decision call is the only asynchronous step in the pipeline. It runs
//! on its own task so the event thread never blocks. A one-permit semaphore
//! guards it: the owned permit moves into the task and is released when the
//! task ends, whatever the outcome. A call that returns no decision, because
//! it errored, hung or panicked, is reported back as a failure and treated as
//! a skip. Candidates arriving while a call is outstanding are dropped, not
//! queued.

use berg_core::Timestamp;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinError;
use uuid::Uuid;

use crate::decision::{
    DecisionAction, DecisionEvent, DecisionRequest, DecisionService, ExecutionSink,
    SessionContext, TradeDecision,
};
use crate::error::Error;
use crate::filters::{
    DedupWindow, FilterRejection, check_capacity, check_counter_trend, check_score_floor,
};
use crate::signal::Signal;

/// Allowed range for the decision threshold
pub const DECISION_THRESHOLD_MIN: i32 = 0;
pub const DECISION_THRESHOLD_MAX: i32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Score the decision service is asked to act on
    pub decision_threshold: i32,
    /// Candidates below `decision_threshold - score_floor_offset` never leave
    pub score_floor_offset: i32,
    /// Opposing session CVD beyond this rejects the candidate
    pub counter_trend_cvd_threshold: i64,
    pub dedup_window_secs: i64,
    pub max_open_positions: usize,
    /// Trades that must be processed before anything is dispatched
    pub warmup_min_trades: u64,
    /// Data-time that must pass before anything is dispatched
    pub warmup_min_secs: i64,
    pub decision_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 40,
            score_floor_offset: 10,
            counter_trend_cvd_threshold: 500,
            dedup_window_secs: 60,
            max_open_positions: 1,
            warmup_min_trades: 100,
            warmup_min_secs: 60,
            decision_timeout_ms: 10_000,
        }
    }
}

/// Holds candidates back until accumulators have had time to settle
#[derive(Debug, Clone)]
pub struct WarmupGate {
    min_trades: u64,
    min_duration: Duration,
    started_at: Option<Timestamp>,
    ready: bool,
}

impl WarmupGate {
    pub fn new(min_trades: u64, min_duration: Duration) -> Self {
        Self {
            min_trades,
            min_duration,
            started_at: None,
            ready: false,
        }
    }

    /// Record data-time; the first call starts the clock
    pub fn observe(&mut self, now: Timestamp) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Ready once both minimums are met; stays ready afterwards
    pub fn is_ready(&mut self, trades: u64, now: Timestamp) -> bool {
        if self.ready {
            return true;
        }
        self.observe(now);
        let elapsed = self.started_at.map(|s| now - s).unwrap_or_else(Duration::zero);
        if trades >= self.min_trades && elapsed >= self.min_duration {
            log::info!(
                "[Orchestrator] Warm-up complete after {} trades / {}s",
                trades,
                elapsed.num_seconds()
            );
            self.ready = true;
        }
        self.ready
    }
}

/// Best-effort text of a decision task failure
fn panic_reason(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    WarmingUp,
    Filtered(FilterRejection),
    /// A decision call is outstanding; candidate dropped
    InFlight,
    /// No async runtime to run the call on
    Unavailable,
    Dispatched(Uuid),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub candidates: u64,
    pub warming_up: u64,
    pub filtered: u64,
    pub dropped_in_flight: u64,
    pub dispatched: u64,
}

pub struct DecisionOrchestrator {
    config: OrchestratorConfig,
    warmup: WarmupGate,
    dedup: DedupWindow,
    decision_threshold: i32,
    permit: Arc<Semaphore>,
    service: Arc<dyn DecisionService>,
    sink: Arc<dyn ExecutionSink>,
    events: mpsc::UnboundedSender<DecisionEvent>,
    open_positions: Arc<AtomicUsize>,
    stats: OrchestratorStats,
}

impl DecisionOrchestrator {
    /// Create an orchestrator and the receiver its decision events arrive on
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn DecisionService>,
        sink: Arc<dyn ExecutionSink>,
    ) -> (Self, mpsc::UnboundedReceiver<DecisionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let decision_threshold = config
            .decision_threshold
            .clamp(DECISION_THRESHOLD_MIN, DECISION_THRESHOLD_MAX);
        let orchestrator = Self {
            warmup: WarmupGate::new(
                config.warmup_min_trades,
                Duration::seconds(config.warmup_min_secs),
            ),
            dedup: DedupWindow::new(Duration::seconds(config.dedup_window_secs)),
            decision_threshold,
            permit: Arc::new(Semaphore::new(1)),
            service,
            sink,
            events,
            open_positions: Arc::new(AtomicUsize::new(0)),
            stats: OrchestratorStats::default(),
            config,
        };
        (orchestrator, receiver)
    }

    /// Feed data-time so the warm-up clock starts with the data
    pub fn observe_time(&mut self, now: Timestamp) {
        self.warmup.observe(now);
    }

    fn prefilter(&self, signal: &Signal, context: &SessionContext) -> Result<(), FilterRejection> {
        check_score_floor(
            signal.score,
            self.decision_threshold,
            self.config.score_floor_offset,
        )?;
        check_counter_trend(
            signal.side,
            context.indicators.cvd,
            self.config.counter_trend_cvd_threshold,
        )?;
        self.dedup
            .check(signal.side, signal.entry_price, context.data_time)?;
        check_capacity(self.open_positions(), self.config.max_open_positions)?;
        Ok(())
    }

    /// Run a candidate through the gate and filters and, if the guard is
    /// free, hand it to the decision service
    pub fn submit(&mut self, signal: Signal, mut context: SessionContext) -> DispatchOutcome {
        self.stats.candidates += 1;
        let now = context.data_time;

        if !self.warmup.is_ready(context.trades_processed, now) {
            self.stats.warming_up += 1;
            log::debug!(
                "[Orchestrator] Warming up, discarding {} @ {}",
                signal.side,
                signal.entry_price
            );
            return DispatchOutcome::WarmingUp;
        }

        if let Err(rejection) = self.prefilter(&signal, &context) {
            self.stats.filtered += 1;
            log::info!(
                "[Orchestrator] Filtered {} @ {} (score {}): {}",
                signal.side,
                signal.entry_price,
                signal.score,
                rejection
            );
            return DispatchOutcome::Filtered(rejection);
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("[Orchestrator] No tokio runtime, cannot dispatch decision");
            return DispatchOutcome::Unavailable;
        };

        let Ok(permit) = Arc::clone(&self.permit).try_acquire_owned() else {
            self.stats.dropped_in_flight += 1;
            log::debug!(
                "[Orchestrator] Decision in flight, dropping {} @ {}",
                signal.side,
                signal.entry_price
            );
            return DispatchOutcome::InFlight;
        };

        self.dedup.record(signal.side, signal.entry_price, now);
        context.decision_threshold = self.decision_threshold;
        context.open_positions = self.open_positions();

        let request = DecisionRequest::new(signal, context);
        let request_id = request.request_id;
        self.stats.dispatched += 1;
        log::info!(
            "[Orchestrator] Dispatching signal {} ({} @ {}, score {}) as {}",
            request.signal.id,
            request.signal.side,
            request.signal.entry_price,
            request.signal.score,
            request_id
        );

        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let events = self.events.clone();
        let open_positions = Arc::clone(&self.open_positions);
        let timeout_ms = self.config.decision_timeout_ms;

        runtime.spawn(async move {
            // Released when this task ends, on every path
            let _permit = permit;
            let limit = std::time::Duration::from_millis(timeout_ms);

            // The call gets its own task so a panicking service unwinds there
            let mut call = {
                let service = Arc::clone(&service);
                let request = request.clone();
                tokio::spawn(async move { service.evaluate(&request).await })
            };

            let result = match tokio::time::timeout(limit, &mut call).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(Error::DecisionPanicked {
                    service: service.name().to_string(),
                    reason: panic_reason(join_error),
                }),
                Err(_) => {
                    call.abort();
                    Err(Error::DecisionTimeout {
                        service: service.name().to_string(),
                        timeout_ms,
                    })
                }
            };

            let signal_id = request.signal.id;
            let event = match result {
                Ok(decision) => {
                    let trade = TradeDecision::from_decision(&request, &decision);
                    log::info!(
                        "[Orchestrator] Decision {:?} for signal {} (confidence {}): {}",
                        decision.action,
                        signal_id,
                        trade.confidence,
                        decision.reasoning
                    );
                    if decision.action == DecisionAction::Take {
                        open_positions.fetch_add(1, Ordering::SeqCst);
                    }
                    let delivered =
                        panic::catch_unwind(AssertUnwindSafe(|| sink.execute(&trade)));
                    if delivered.is_err() {
                        log::error!(
                            "[Orchestrator] Execution sink panicked on signal {}",
                            signal_id
                        );
                    }
                    DecisionEvent::Resolved {
                        request_id,
                        signal_id,
                        decision,
                    }
                }
                Err(error) => {
                    log::warn!(
                        "[Orchestrator] Decision for signal {} failed, treating as skip: {}",
                        signal_id,
                        error
                    );
                    DecisionEvent::Failed {
                        request_id,
                        signal_id,
                        error,
                    }
                }
            };

            if events.send(event).is_err() {
                log::debug!("[Orchestrator] Event receiver dropped");
            }
        });

        DispatchOutcome::Dispatched(request_id)
    }

    /// Is a decision call outstanding?
    pub fn is_in_flight(&self) -> bool {
        self.permit.available_permits() == 0
    }

    pub fn decision_threshold(&self) -> i32 {
        self.decision_threshold
    }

    /// Set the decision threshold, clamped; returns the stored value
    pub fn set_decision_threshold(&mut self, value: i32) -> i32 {
        let clamped = value.clamp(DECISION_THRESHOLD_MIN, DECISION_THRESHOLD_MAX);
        if clamped != value {
            log::warn!(
                "[Orchestrator] Decision threshold {} clamped to {}",
                value,
                clamped
            );
        }
        log::info!(
            "[Orchestrator] Decision threshold {} -> {}",
            self.decision_threshold,
            clamped
        );
        self.decision_threshold = clamped;
        clamped
    }

    pub fn open_positions(&self) -> usize {
        self.open_positions.load(Ordering::SeqCst)
    }

    /// A taken position was closed
    pub fn position_closed(&self) {
        let _ = self
            .open_positions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
