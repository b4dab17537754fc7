//! Decision Orchestrator Integration Test
//!
//! Drives the orchestrator with counting mock decision services:
//! 1. Warm-up gate and pre-filters discard candidates without dispatching
//! 2. Only one decision call is ever outstanding
//! 3. Success, error, timeout and panic all release the guard
//! 4. Taken decisions reach the sink and count against capacity

use async_trait::async_trait;
use berg_core::{SessionPhase, Side, Tick, Timestamp};
use berg_indicators::IndicatorSuite;
use berg_order_manager::{
    Decision, DecisionEvent, DecisionOrchestrator, DecisionRequest, DecisionService,
    DispatchOutcome, Error, ExecutionSink, FilterRejection, OrchestratorConfig, Result,
    SessionContext, Signal, SignalId, TradeDecision,
};
use berg_risk_manager::{RiskCalculator, RiskConfig, RiskInputs, TradeMemory};
use berg_strategy::ScoreBreakdown;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// === Mocks ===

enum Behaviour {
    Take,
    Skip,
    Fail,
    Hang,
    Panic,
}

struct CountingService {
    behaviour: Behaviour,
    delay_ms: u64,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingService {
    fn new(behaviour: Behaviour, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            delay_ms,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionService for CountingService {
    async fn evaluate(&self, request: &DecisionRequest) -> Result<Decision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if matches!(self.behaviour, Behaviour::Hang) {
            std::future::pending::<()>().await;
        }
        if matches!(self.behaviour, Behaviour::Panic) {
            panic!("model crashed");
        }
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behaviour {
            Behaviour::Take => Ok(Decision::take(dec!(0.8), "mock take")
                .with_levels(request.signal.risk.stop_ticks, request.signal.risk.target_ticks)),
            Behaviour::Skip | Behaviour::Hang | Behaviour::Panic => Ok(Decision::skip("mock skip")),
            Behaviour::Fail => Err(Error::DecisionService {
                service: "counting".to_string(),
                reason: "upstream unavailable".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[derive(Default)]
struct RecordingSink {
    decisions: Mutex<Vec<TradeDecision>>,
}

impl RecordingSink {
    fn count(&self) -> usize {
        self.decisions.lock().map(|d| d.len()).unwrap_or(0)
    }
}

impl ExecutionSink for RecordingSink {
    fn execute(&self, decision: &TradeDecision) {
        if let Ok(mut decisions) = self.decisions.lock() {
            decisions.push(decision.clone());
        }
    }
}

// === Helpers ===

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
}

fn signal(id: SignalId, side: Side, price: Tick, score: i32) -> Signal {
    let suite = IndicatorSuite::default();
    let memory = TradeMemory::default();
    let risk = RiskCalculator::new(RiskConfig::default()).calculate(&RiskInputs {
        side,
        entry_price: price,
        phase: SessionPhase::Midday,
        indicators: &suite,
        memory: &memory,
    });
    let breakdown = ScoreBreakdown {
        iceberg: score,
        floor: -50,
        ..Default::default()
    };
    Signal::new(id, t0(), side, price, 150, breakdown, risk)
}

fn context(now: Timestamp, trades: u64) -> SessionContext {
    SessionContext {
        data_time: now,
        phase: SessionPhase::Midday,
        trades_processed: trades,
        decision_threshold: 0,
        iceberg_thresholds: (25, 100),
        open_positions: 0,
        recent_win_rate: None,
        indicators: IndicatorSuite::default().values(now),
    }
}

fn open_config() -> OrchestratorConfig {
    OrchestratorConfig {
        warmup_min_trades: 0,
        warmup_min_secs: 0,
        max_open_positions: 100,
        ..Default::default()
    }
}

// === Tests ===

#[tokio::test(start_paused = true)]
async fn test_concurrent_arrivals_are_dropped_while_in_flight() {
    let _ = env_logger::try_init();
    let service = CountingService::new(Behaviour::Skip, 100);
    let sink = Arc::new(RecordingSink::default());
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(open_config(), service.clone(), sink.clone());

    let first = orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 500));
    assert!(matches!(first, DispatchOutcome::Dispatched(_)));
    assert!(orchestrator.is_in_flight());

    for i in 1..10 {
        let outcome = orchestrator.submit(
            signal(1 + i, Side::Bid, 1000 + i as Tick, 60),
            context(t0(), 500),
        );
        assert_eq!(outcome, DispatchOutcome::InFlight);
    }

    let event = events.recv().await;
    assert!(matches!(event, Some(DecisionEvent::Resolved { signal_id: 1, .. })));
    assert!(!orchestrator.is_in_flight());

    // Dropped candidates were not recorded for de-duplication
    let retry = orchestrator.submit(signal(20, Side::Bid, 1005, 60), context(t0(), 500));
    assert!(matches!(retry, DispatchOutcome::Dispatched(_)));
    assert!(events.recv().await.is_some());

    assert_eq!(service.calls(), 2);
    assert_eq!(service.max_in_flight(), 1);
    assert_eq!(orchestrator.stats().dropped_in_flight, 9);
    assert_eq!(sink.count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_never_more_than_one_outstanding_call() {
    let service = CountingService::new(Behaviour::Skip, 2);
    let sink = Arc::new(RecordingSink::default());
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(open_config(), service.clone(), sink.clone());

    let mut dispatched = 0;
    for i in 0..300 {
        let now = t0() + Duration::milliseconds(i);
        let outcome = orchestrator.submit(
            signal(i as SignalId, Side::Bid, 1000 + i as Tick, 60),
            context(now, 500),
        );
        if matches!(outcome, DispatchOutcome::Dispatched(_)) {
            dispatched += 1;
        }
        tokio::task::yield_now().await;
    }

    for _ in 0..dispatched {
        assert!(events.recv().await.is_some());
    }

    assert!(dispatched >= 1);
    assert_eq!(service.calls(), dispatched);
    assert_eq!(service.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_releases_guard() {
    let service = CountingService::new(Behaviour::Hang, 0);
    let sink = Arc::new(RecordingSink::default());
    let config = OrchestratorConfig {
        decision_timeout_ms: 1_000,
        ..open_config()
    };
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(config, service.clone(), sink.clone());

    orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 500));
    match events.recv().await {
        Some(DecisionEvent::Failed { error, .. }) => {
            assert_eq!(
                error,
                Error::DecisionTimeout {
                    service: "counting".to_string(),
                    timeout_ms: 1_000
                }
            );
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    assert!(!orchestrator.is_in_flight());
    assert_eq!(sink.count(), 0);
    let next = orchestrator.submit(signal(2, Side::Ask, 1010, 60), context(t0(), 500));
    assert!(matches!(next, DispatchOutcome::Dispatched(_)));
}

#[tokio::test]
async fn test_error_releases_guard_and_skips() {
    let service = CountingService::new(Behaviour::Fail, 0);
    let sink = Arc::new(RecordingSink::default());
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(open_config(), service.clone(), sink.clone());

    orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 500));
    assert!(matches!(
        events.recv().await,
        Some(DecisionEvent::Failed { signal_id: 1, .. })
    ));
    assert_eq!(sink.count(), 0);
    assert_eq!(orchestrator.open_positions(), 0);

    let next = orchestrator.submit(signal(2, Side::Bid, 1001, 60), context(t0(), 500));
    assert!(matches!(next, DispatchOutcome::Dispatched(_)));
}

#[tokio::test]
async fn test_panicking_service_reports_failure() {
    let _ = env_logger::try_init();
    let service = CountingService::new(Behaviour::Panic, 0);
    let sink = Arc::new(RecordingSink::default());
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(open_config(), service.clone(), sink.clone());

    orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 500));
    let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .expect("a failure event after the panic");
    match event {
        Some(DecisionEvent::Failed {
            signal_id: 1,
            error: Error::DecisionPanicked { service, reason },
            ..
        }) => {
            assert_eq!(service, "counting");
            assert!(reason.contains("model crashed"));
        }
        other => panic!("expected panic failure, got {:?}", other),
    }

    assert!(!orchestrator.is_in_flight());
    assert_eq!(sink.count(), 0);
    assert_eq!(orchestrator.open_positions(), 0);
    let next = orchestrator.submit(signal(2, Side::Bid, 1001, 60), context(t0(), 500));
    assert!(matches!(next, DispatchOutcome::Dispatched(_)));
}

#[tokio::test]
async fn test_take_reaches_sink_and_fills_capacity() {
    let service = CountingService::new(Behaviour::Take, 0);
    let sink = Arc::new(RecordingSink::default());
    let config = OrchestratorConfig {
        max_open_positions: 1,
        ..open_config()
    };
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(config, service.clone(), sink.clone());

    orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 500));
    assert!(events.recv().await.is_some());
    assert_eq!(sink.count(), 1);
    assert_eq!(orchestrator.open_positions(), 1);

    let blocked = orchestrator.submit(signal(2, Side::Bid, 1020, 60), context(t0(), 500));
    assert_eq!(
        blocked,
        DispatchOutcome::Filtered(FilterRejection::AtCapacity { open: 1, max: 1 })
    );

    orchestrator.position_closed();
    let next = orchestrator.submit(signal(3, Side::Bid, 1020, 60), context(t0(), 500));
    assert!(matches!(next, DispatchOutcome::Dispatched(_)));
}

#[tokio::test]
async fn test_gate_and_filters_run_in_order() {
    let service = CountingService::new(Behaviour::Skip, 0);
    let sink = Arc::new(RecordingSink::default());
    let config = OrchestratorConfig {
        warmup_min_trades: 100,
        warmup_min_secs: 0,
        ..open_config()
    };
    let (mut orchestrator, mut events) =
        DecisionOrchestrator::new(config, service.clone(), sink.clone());

    // Warm-up discards without recording anything
    assert_eq!(
        orchestrator.submit(signal(1, Side::Bid, 1000, 60), context(t0(), 10)),
        DispatchOutcome::WarmingUp
    );

    // Score floor is 40 - 10
    assert_eq!(
        orchestrator.submit(signal(2, Side::Bid, 1000, 29), context(t0(), 200)),
        DispatchOutcome::Filtered(FilterRejection::ScoreBelowFloor { score: 29, floor: 30 })
    );

    // Session CVD far against a long
    let mut bearish = context(t0(), 200);
    bearish.indicators.cvd = -600;
    assert!(matches!(
        orchestrator.submit(signal(3, Side::Bid, 1000, 60), bearish),
        DispatchOutcome::Filtered(FilterRejection::CounterTrend { .. })
    ));

    let sent = orchestrator.submit(signal(4, Side::Bid, 1000, 60), context(t0(), 200));
    assert!(matches!(sent, DispatchOutcome::Dispatched(_)));
    assert!(events.recv().await.is_some());

    let later = t0() + Duration::seconds(30);
    assert!(matches!(
        orchestrator.submit(signal(5, Side::Bid, 1000, 60), context(later, 300)),
        DispatchOutcome::Filtered(FilterRejection::Duplicate { .. })
    ));

    let much_later = t0() + Duration::seconds(61);
    assert!(matches!(
        orchestrator.submit(signal(6, Side::Bid, 1000, 60), context(much_later, 400)),
        DispatchOutcome::Dispatched(_)
    ));
    assert!(events.recv().await.is_some());

    assert_eq!(service.calls(), 2);
    let stats = orchestrator.stats();
    assert_eq!(stats.warming_up, 1);
    assert_eq!(stats.filtered, 3);
    assert_eq!(stats.dispatched, 2);
}

#[tokio::test]
async fn test_decision_threshold_is_clamped() {
    let service = CountingService::new(Behaviour::Skip, 0);
    let sink = Arc::new(RecordingSink::default());
    let (mut orchestrator, _events) = DecisionOrchestrator::new(open_config(), service, sink);

    assert_eq!(orchestrator.set_decision_threshold(250), 100);
    assert_eq!(orchestrator.set_decision_threshold(-5), 0);
    assert_eq!(orchestrator.set_decision_threshold(55), 55);
    assert_eq!(orchestrator.decision_threshold(), 55);
}
