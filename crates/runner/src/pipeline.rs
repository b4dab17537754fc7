//! Signal Pipeline
//!
//! Wires the market data feed through every component on one thread:
//!
//! ```text
//! order events ──► IcebergEngine ──┐
//! trades ────────► IndicatorSuite  │ BookUpdate
//!                      │           ▼
//!                      └──► ConfluenceScorer + RiskCalculator ──► Signal
//!                                                                   │
//!                    DecisionEvent ◄── DecisionOrchestrator ◄───────┘
//!                          │                   │ dispatched
//!            adjustments ◄─┘                   ▼
//!                                       OutcomeTracker ──► TradeMemory
//! ```
//!
//! Every callback advances the data clock first, so session phase, cooldowns
//! and horizons all run on feed time. Decision results are drained at the
//! start of each callback and applied here, never from the decision task.

use berg_clock::{Clock, DataClock};
use berg_core::{FeedEvent, Order, OrderId, SessionPhase, Side, Size, Tick, Timestamp, Trade};
use berg_indicators::{IndicatorSuite, IndicatorValues};
use berg_order_manager::{
    Decision, DecisionAction, DecisionEvent, DecisionOrchestrator, DecisionService,
    DispatchOutcome, ExecutionSink, OrchestratorStats, OutcomeStats, OutcomeTracker,
    ResolvedOutcome, SessionContext, Signal, SignalId,
};
use berg_ports::MarketDataHandler;
use berg_risk_manager::{RiskCalculator, RiskInputs, TradeMemory};
use berg_strategy::{
    ConfluenceScorer, ConfluenceWeights, IcebergCandidate, IcebergEngine, ScoringContext,
    ThresholdSnapshot,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::EngineConfig;

/// Running counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub events: u64,
    pub trades_processed: u64,
    pub candidates: u64,
    pub dispatched: u64,
    pub decisions: u64,
    pub taken: u64,
    pub decision_failures: u64,
    pub session_resets: u64,
}

/// Read-only copy of the pipeline state for reporting
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub data_time: Timestamp,
    pub phase: SessionPhase,
    pub stats: PipelineStats,
    pub orchestrator: OrchestratorStats,
    pub decision_threshold: i32,
    pub open_positions: usize,
    pub thresholds: ThresholdSnapshot,
    pub weights: ConfluenceWeights,
    pub indicators: IndicatorValues,
    pub outcomes: OutcomeStats,
    pub memory_win_rate: Option<Decimal>,
    pub signals: Vec<Signal>,
}

pub struct SignalPipeline {
    config: EngineConfig,
    clock: DataClock,
    session_date: Option<NaiveDate>,
    indicators: IndicatorSuite,
    engine: IcebergEngine,
    scorer: ConfluenceScorer,
    risk: RiskCalculator,
    memory: TradeMemory,
    orchestrator: DecisionOrchestrator,
    decisions: mpsc::UnboundedReceiver<DecisionEvent>,
    outcomes: Arc<OutcomeTracker>,
    /// Dispatched signals whose decision has not come back yet
    awaiting: usize,
    /// Taken signals the outcome tracker has not resolved yet
    positions: HashSet<SignalId>,
    next_signal_id: SignalId,
    stats: PipelineStats,
}

impl SignalPipeline {
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn DecisionService>,
        sink: Arc<dyn ExecutionSink>,
    ) -> Self {
        config.log_warnings();

        let (orchestrator, decisions) =
            DecisionOrchestrator::new(config.orchestrator.clone(), service, sink);
        log::info!(
            "[Pipeline] Starting on {} (decision threshold {}, thresholds {}/{}{})",
            config.instrument.symbol,
            orchestrator.decision_threshold(),
            config.thresholds.order_count_threshold,
            config.thresholds.size_threshold,
            if config.thresholds.adaptive { " adaptive" } else { "" }
        );

        Self {
            clock: DataClock::new(),
            session_date: None,
            indicators: IndicatorSuite::new(config.indicators.clone()),
            engine: IcebergEngine::new(config.thresholds.clone(), config.iceberg.clone()),
            scorer: ConfluenceScorer::new(config.confluence.clone(), config.weights.clone()),
            risk: RiskCalculator::new(config.risk.clone()),
            memory: TradeMemory::new(config.risk.memory_trades),
            orchestrator,
            decisions,
            outcomes: Arc::new(OutcomeTracker::new(config.outcome.clone())),
            awaiting: 0,
            positions: HashSet::new(),
            next_signal_id: 0,
            stats: PipelineStats::default(),
            config,
        }
    }

    /// Move data-time forward, roll the session if the date changed, and
    /// apply any decisions that came back
    fn advance(&mut self, ts: Timestamp) -> Timestamp {
        let now = self.clock.advance(ts);
        self.stats.events += 1;

        let date = self.config.session.session_date(now);
        match self.session_date {
            Some(previous) if previous != date => {
                log::info!("[Pipeline] Session rollover {} -> {}", previous, date);
                self.indicators.reset_session();
                self.stats.session_resets += 1;
            }
            _ => {}
        }
        self.session_date = Some(date);

        self.orchestrator.observe_time(now);
        self.drain_decisions();
        now
    }

    /// Apply every decision event already delivered; returns how many
    pub fn drain_decisions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.decisions.try_recv() {
            self.apply_decision(event);
            applied += 1;
        }
        applied
    }

    /// Wait for every outstanding decision and apply it
    pub async fn flush(&mut self) {
        while self.awaiting > 0 {
            match self.decisions.recv().await {
                Some(event) => self.apply_decision(event),
                None => break,
            }
        }
    }

    /// Handle one event, then wait for any decision it dispatched
    ///
    /// Each decision lands at the same point in the feed on every run, so a
    /// replay of the same file always ends in the same state.
    pub async fn replay_event(&mut self, event: FeedEvent) {
        self.handle(event);
        self.flush().await;
    }

    fn apply_decision(&mut self, event: DecisionEvent) {
        self.awaiting = self.awaiting.saturating_sub(1);
        match event {
            DecisionEvent::Resolved {
                signal_id,
                decision,
                ..
            } => {
                self.stats.decisions += 1;
                if decision.action == DecisionAction::Take {
                    self.stats.taken += 1;
                    match self.outcomes.get(signal_id) {
                        Some(signal) if signal.is_open() => {
                            self.positions.insert(signal_id);
                        }
                        // Resolved before the decision came back
                        _ => self.orchestrator.position_closed(),
                    }
                }
                self.apply_adjustments(&decision);
            }
            DecisionEvent::Failed {
                signal_id, error, ..
            } => {
                self.stats.decision_failures += 1;
                log::warn!(
                    "[Pipeline] Signal {} skipped, decision failed: {}",
                    signal_id,
                    error
                );
            }
        }
    }

    fn apply_adjustments(&mut self, decision: &Decision) {
        if let Some(adjustment) = decision.threshold_adjustment {
            self.engine
                .thresholds_mut()
                .apply_adjustment(adjustment.order_count, adjustment.size);
        }
        if let Some(adjustment) = &decision.weight_adjustment {
            for (key, value) in &adjustment.changes {
                let stored = self.scorer.weights_mut().set(*key, *value);
                log::info!("[Pipeline] Weight {} -> {}", key, stored);
            }
        }
        if let Some(threshold) = decision.decision_threshold {
            self.orchestrator.set_decision_threshold(threshold);
        }
    }

    fn record_outcomes(&mut self, resolved: Vec<ResolvedOutcome>) {
        for outcome in resolved {
            self.memory.record(outcome.excursion());
            if self.positions.remove(&outcome.signal_id) {
                self.orchestrator.position_closed();
            }
        }
    }

    /// Hand the current book depth to the DOM analyzer (it rate-limits itself)
    fn refresh_depth(&mut self, now: Timestamp) {
        let book = self.engine.book();
        let reference = self
            .indicators
            .last_price()
            .or_else(|| book.best_bid().map(|(price, _)| price))
            .or_else(|| book.best_ask().map(|(price, _)| price));
        let Some(reference) = reference else {
            return;
        };

        let levels = self.config.indicators.dom.scan_range_ticks.max(1) as usize;
        let bids = book.depth(Side::Bid, levels);
        let asks = book.depth(Side::Ask, levels);
        self.indicators.on_depth(&bids, &asks, reference, now);
    }

    fn session_context(&self, now: Timestamp, phase: SessionPhase) -> SessionContext {
        SessionContext {
            data_time: now,
            phase,
            trades_processed: self.stats.trades_processed,
            decision_threshold: self.orchestrator.decision_threshold(),
            iceberg_thresholds: self.engine.thresholds().current(),
            open_positions: self.orchestrator.open_positions(),
            recent_win_rate: self.memory.win_rate(),
            indicators: self.indicators.values(now),
        }
    }

    /// Score, size and dispatch one iceberg candidate
    fn process_candidate(&mut self, candidate: IcebergCandidate, now: Timestamp) {
        self.stats.candidates += 1;
        let phase = self.config.session.phase(now);

        let breakdown = self.scorer.score(&ScoringContext {
            side: candidate.side,
            price: candidate.price,
            size: candidate.total_size,
            now,
            phase,
            indicators: &self.indicators,
        });
        let risk = self.risk.calculate(&RiskInputs {
            side: candidate.side,
            entry_price: candidate.price,
            phase,
            indicators: &self.indicators,
            memory: &self.memory,
        });
        let breakdown = breakdown.with_risk_adjustment(risk.score_adjustment());

        self.next_signal_id += 1;
        let signal = Signal::new(
            self.next_signal_id,
            now,
            candidate.side,
            candidate.price,
            candidate.total_size,
            breakdown,
            risk,
        );
        log::info!(
            "[Pipeline] Candidate {} {} @ {} size {} score {} (SL {} {} / TP {} {})",
            signal.id,
            signal.side,
            signal.entry_price,
            signal.total_size,
            signal.score,
            signal.risk.stop_ticks,
            signal.risk.stop_source,
            signal.risk.target_ticks,
            signal.risk.target_source
        );

        let context = self.session_context(now, phase);
        if let DispatchOutcome::Dispatched(_) = self.orchestrator.submit(signal.clone(), context) {
            self.awaiting += 1;
            self.stats.dispatched += 1;
            self.outcomes.track(signal);
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn indicators(&self) -> &IndicatorSuite {
        &self.indicators
    }

    pub fn engine(&self) -> &IcebergEngine {
        &self.engine
    }

    pub fn scorer(&self) -> &ConfluenceScorer {
        &self.scorer
    }

    pub fn memory(&self) -> &TradeMemory {
        &self.memory
    }

    pub fn orchestrator(&self) -> &DecisionOrchestrator {
        &self.orchestrator
    }

    /// Shared handle for a reporting consumer on another thread
    pub fn outcomes(&self) -> Arc<OutcomeTracker> {
        Arc::clone(&self.outcomes)
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let now = self.clock.now();
        PipelineSnapshot {
            data_time: now,
            phase: self.config.session.phase(now),
            stats: self.stats.clone(),
            orchestrator: self.orchestrator.stats().clone(),
            decision_threshold: self.orchestrator.decision_threshold(),
            open_positions: self.orchestrator.open_positions(),
            thresholds: self.engine.thresholds().snapshot(),
            weights: self.scorer.weights().clone(),
            indicators: self.indicators.values(now),
            outcomes: self.outcomes.stats(),
            memory_win_rate: self.memory.win_rate(),
            signals: self.outcomes.snapshot(),
        }
    }
}

impl MarketDataHandler for SignalPipeline {
    fn on_order_add(&mut self, order: Order) {
        self.advance(order.inserted_at);
        self.engine.on_add(order);
    }

    fn on_order_replace(&mut self, order_id: OrderId, price: Tick, size: Size, timestamp: Timestamp) {
        let now = self.advance(timestamp);
        self.engine.on_replace(order_id, price, size, now);
    }

    fn on_order_cancel(&mut self, order_id: OrderId, timestamp: Timestamp) {
        let now = self.advance(timestamp);
        self.engine.on_cancel(order_id, now);
    }

    fn on_trade(&mut self, trade: Trade) {
        let now = self.advance(trade.timestamp);
        // Signals that expired during a gap close at the last price before it
        if let Some(price) = self.indicators.last_price() {
            let expired = self.outcomes.check_timeouts(price, now);
            self.record_outcomes(expired);
        }
        self.indicators.on_trade(&trade);
        self.stats.trades_processed += 1;
        let resolved = self.outcomes.on_trade(trade.price, now);
        self.record_outcomes(resolved);
    }

    fn on_book_update(&mut self, timestamp: Timestamp) {
        let now = self.advance(timestamp);
        self.refresh_depth(now);
        for candidate in self.engine.on_book_update(now) {
            self.process_candidate(candidate, now);
        }
    }

    fn on_time(&mut self, timestamp: Timestamp) {
        let now = self.advance(timestamp);
        if let Some(price) = self.indicators.last_price() {
            let resolved = self.outcomes.check_timeouts(price, now);
            self.record_outcomes(resolved);
        }
    }
}
