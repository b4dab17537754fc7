//! Pipeline Replay Test
//!
//! Replays scripted feeds through the whole pipeline:
//! 1. An iceberg burst becomes one dispatched signal
//! 2. The decision comes back and opens a position
//! 3. Price follows through and the outcome lands in trade memory
//! 4. Decision adjustments reach thresholds, weights and the orchestrator
//! 5. A crashing decision service cannot stall the replay

use async_trait::async_trait;
use berg_core::{FeedEvent, Order, Trade};
use berg_order_manager::{
    Decision, DecisionRequest, DecisionService, Result, SignalStatus, ThresholdAdjustment,
    WeightAdjustment,
};
use berg_runner::feed::to_json_lines;
use berg_runner::{EngineConfig, JsonLinesFeed, LoggingSink, MarketDataHandler, SignalPipeline};
use berg_strategy::WeightKey;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::io::Cursor;
use std::sync::Arc;

// === Mocks ===

struct AlwaysTake;

#[async_trait]
impl DecisionService for AlwaysTake {
    async fn evaluate(&self, request: &DecisionRequest) -> Result<Decision> {
        Ok(Decision::take(dec!(0.9), format!("take signal {}", request.signal.id)))
    }
}

struct Adjusting;

#[async_trait]
impl DecisionService for Adjusting {
    async fn evaluate(&self, _request: &DecisionRequest) -> Result<Decision> {
        let mut decision = Decision::skip("tighten up");
        decision.threshold_adjustment = Some(ThresholdAdjustment {
            order_count: Some(40),
            size: None,
        });
        decision.weight_adjustment = Some(WeightAdjustment {
            changes: vec![(WeightKey::BigFish, 99), (WeightKey::TapeSpeed, 3)],
        });
        decision.decision_threshold = Some(150);
        Ok(decision)
    }
}

struct Crashing;

#[async_trait]
impl DecisionService for Crashing {
    async fn evaluate(&self, _request: &DecisionRequest) -> Result<Decision> {
        panic!("decision model crashed");
    }
}

/// Takes after a short pause, long enough to span several feed events
struct SlowTake;

#[async_trait]
impl DecisionService for SlowTake {
    async fn evaluate(&self, request: &DecisionRequest) -> Result<Decision> {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        Ok(Decision::take(dec!(0.7), format!("slow take {}", request.signal.id)))
    }
}

// === Helpers ===

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
}

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.thresholds.adaptive = false;
    config.orchestrator.warmup_min_trades = 0;
    config.orchestrator.warmup_min_secs = 0;
    config.orchestrator.decision_threshold = 0;
    config.orchestrator.score_floor_offset = 100;
    config
}

fn pipeline(service: Arc<dyn DecisionService>) -> SignalPipeline {
    SignalPipeline::new(test_config(), service, Arc::new(LoggingSink::new()))
}

/// One print, then 30 bids of 5 at 1000 inside a second, then the batch marker
fn iceberg_burst() -> Vec<FeedEvent> {
    let mut events = vec![FeedEvent::trade(Trade::buy(1000, 1, t0()))];
    for i in 0..30 {
        let ts = t0() + Duration::milliseconds(i * 30);
        events.push(FeedEvent::add(Order::bid(i as u64 + 1, 1000, 5, ts)));
    }
    events.push(FeedEvent::book_update(t0() + Duration::milliseconds(900)));
    events
}

fn replay(pipeline: &mut SignalPipeline, events: &[FeedEvent]) {
    let text = to_json_lines(events).unwrap();
    for event in JsonLinesFeed::new(Cursor::new(text)) {
        pipeline.handle(event);
    }
}

/// Replay the way the binary does, settling decisions after every event
async fn replay_settled(pipeline: &mut SignalPipeline, events: &[FeedEvent]) {
    let text = to_json_lines(events).unwrap();
    for event in JsonLinesFeed::new(Cursor::new(text)) {
        pipeline.replay_event(event).await;
    }
}

/// Two iceberg bursts at different prices with follow-through prints between
fn busy_session() -> Vec<FeedEvent> {
    let mut events = iceberg_burst();
    for k in 1..=4 {
        let ts = t0() + Duration::milliseconds(900 + k * 10);
        events.push(FeedEvent::trade(Trade::buy(1000 + k, 2, ts)));
    }
    let later = t0() + Duration::seconds(5);
    for i in 0..30 {
        let ts = later + Duration::milliseconds(i * 30);
        events.push(FeedEvent::add(Order::ask(100 + i as u64, 1020, 5, ts)));
    }
    events.push(FeedEvent::book_update(later + Duration::milliseconds(900)));
    for k in 1..=12 {
        let ts = later + Duration::seconds(1 + k);
        events.push(FeedEvent::trade(Trade::sell(1020 - k, 2, ts)));
    }
    events
}

// === Tests ===

#[tokio::test]
async fn test_burst_to_profitable_outcome() {
    let _ = env_logger::try_init();
    let mut pipeline = pipeline(Arc::new(AlwaysTake));

    replay(&mut pipeline, &iceberg_burst());
    assert_eq!(pipeline.stats().candidates, 1);
    assert_eq!(pipeline.stats().dispatched, 1);

    pipeline.flush().await;
    assert_eq!(pipeline.stats().taken, 1);
    assert_eq!(pipeline.orchestrator().open_positions(), 1);

    let follow_through: Vec<FeedEvent> = (1..=10)
        .map(|k| FeedEvent::trade(Trade::buy(1000 + k, 2, t0() + Duration::seconds(2 + k))))
        .collect();
    replay(&mut pipeline, &follow_through);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.signals.len(), 1);
    let signal = &snapshot.signals[0];
    assert_eq!(signal.entry_price, 1000);
    assert_eq!(signal.total_size, 150);
    assert_eq!(signal.status, SignalStatus::Profitable);
    assert_eq!(signal.exit_price, Some(1010));
    assert_eq!(signal.elapsed(), Some(Duration::milliseconds(11_100)));

    assert_eq!(snapshot.open_positions, 0);
    assert_eq!(snapshot.outcomes.profitable, 1);
    assert_eq!(snapshot.stats.trades_processed, 11);
    assert_eq!(pipeline.memory().len(), 1);
    assert_eq!(snapshot.memory_win_rate, Some(dec!(1)));
}

#[tokio::test]
async fn test_quiet_tape_times_out_on_data_time() {
    let mut pipeline = pipeline(Arc::new(AlwaysTake));

    replay(&mut pipeline, &iceberg_burst());
    pipeline.flush().await;
    assert_eq!(pipeline.orchestrator().open_positions(), 1);

    replay(
        &mut pipeline,
        &[
            FeedEvent::trade(Trade::sell(998, 1, t0() + Duration::seconds(30))),
            FeedEvent::Time {
                timestamp: t0() + Duration::seconds(301),
            },
        ],
    );

    let signals = pipeline.outcomes().snapshot();
    assert_eq!(signals[0].status, SignalStatus::TimedOut);
    assert_eq!(signals[0].exit_price, Some(998));
    assert_eq!(signals[0].mae_ticks, 2);
    assert_eq!(pipeline.orchestrator().open_positions(), 0);
}

#[tokio::test]
async fn test_print_after_gap_does_not_resolve_expired_signal() {
    let mut pipeline = pipeline(Arc::new(AlwaysTake));

    replay(&mut pipeline, &iceberg_burst());
    pipeline.flush().await;

    replay(
        &mut pipeline,
        &[
            FeedEvent::trade(Trade::buy(1003, 1, t0() + Duration::seconds(20))),
            // Ten ticks in favour, but only after the horizon has passed
            FeedEvent::trade(Trade::buy(1012, 1, t0() + Duration::seconds(400))),
        ],
    );

    let signals = pipeline.outcomes().snapshot();
    assert_eq!(signals[0].status, SignalStatus::TimedOut);
    assert_eq!(signals[0].exit_price, Some(1003));
    assert_eq!(signals[0].mfe_ticks, 3);
    assert_eq!(pipeline.snapshot().outcomes.profitable, 0);
    assert_eq!(pipeline.orchestrator().open_positions(), 0);
}

#[tokio::test]
async fn test_decision_adjustments_are_applied_with_bounds() {
    let mut pipeline = pipeline(Arc::new(Adjusting));

    replay(&mut pipeline, &iceberg_burst());
    pipeline.flush().await;

    assert_eq!(pipeline.stats().decisions, 1);
    assert_eq!(pipeline.stats().taken, 0);
    assert_eq!(pipeline.engine().thresholds().current(), (40, 100));
    assert_eq!(pipeline.scorer().weights().get(WeightKey::BigFish), 20);
    assert_eq!(pipeline.scorer().weights().get(WeightKey::TapeSpeed), 3);
    assert_eq!(pipeline.orchestrator().decision_threshold(), 100);
}

#[tokio::test]
async fn test_session_rollover_resets_session_accumulators() {
    let mut pipeline = pipeline(Arc::new(AlwaysTake));

    replay(
        &mut pipeline,
        &[
            FeedEvent::trade(Trade::buy(1000, 10, t0())),
            FeedEvent::trade(Trade::sell(1000, 4, t0() + Duration::seconds(1))),
        ],
    );
    assert_eq!(pipeline.indicators().cvd().value(), 6);

    replay(
        &mut pipeline,
        &[FeedEvent::trade(Trade::buy(1002, 3, t0() + Duration::days(1)))],
    );
    assert_eq!(pipeline.indicators().cvd().value(), 3);
    assert_eq!(pipeline.stats().session_resets, 1);
    assert_eq!(pipeline.now(), t0() + Duration::days(1));
}

#[tokio::test]
async fn test_panicking_service_does_not_stall_replay() {
    let _ = env_logger::try_init();
    let mut pipeline = pipeline(Arc::new(Crashing));

    let settled = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        replay_settled(&mut pipeline, &iceberg_burst()),
    )
    .await;
    assert!(settled.is_ok(), "replay stalled after the decision service panicked");

    assert_eq!(pipeline.stats().dispatched, 1);
    assert_eq!(pipeline.stats().decision_failures, 1);
    assert_eq!(pipeline.stats().taken, 0);
    assert!(!pipeline.orchestrator().is_in_flight());
    assert_eq!(pipeline.orchestrator().open_positions(), 0);

    // The next burst is dispatched again
    let later: Vec<FeedEvent> = (0..30)
        .map(|i| {
            let ts = t0() + Duration::seconds(120) + Duration::milliseconds(i * 30);
            FeedEvent::add(Order::bid(500 + i as u64, 990, 5, ts))
        })
        .chain(std::iter::once(FeedEvent::book_update(
            t0() + Duration::seconds(121),
        )))
        .collect();
    replay_settled(&mut pipeline, &later).await;
    assert_eq!(pipeline.stats().dispatched, 2);
    assert_eq!(pipeline.stats().decision_failures, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_settled_replay_is_repeatable() {
    let events = busy_session();

    let mut first = pipeline(Arc::new(SlowTake));
    replay_settled(&mut first, &events).await;
    let mut second = pipeline(Arc::new(SlowTake));
    replay_settled(&mut second, &events).await;

    assert!(first.stats().dispatched >= 1);
    assert_eq!(first.stats().decisions, first.stats().dispatched);
    assert_eq!(
        serde_json::to_value(first.snapshot()).unwrap(),
        serde_json::to_value(second.snapshot()).unwrap()
    );
}
