//! Outcome Tracker
//!
//! Follows every dispatched signal on the tape until price has moved far
//! enough either way, or the tracking horizon runs out. Resolved signals
//! stay around for reporting until the retention period passes.
//!
//! The map is a `DashMap` so a reporting consumer can take snapshots while
//! the event thread keeps resolving; snapshots are cloned, never borrowed.

use berg_core::{Side, Tick, Timestamp};
use berg_risk_manager::TradeExcursion;
use chrono::Duration;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::signal::{Signal, SignalId, SignalStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Favourable or adverse move that resolves a signal
    pub significance_ticks: i64,
    /// Signals still open after this are resolved as timed out
    pub horizon_secs: i64,
    /// Resolved signals are purged after this
    pub retention_secs: i64,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            significance_ticks: 10,
            horizon_secs: 300,
            retention_secs: 3600,
        }
    }
}

/// A signal that just resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    pub signal_id: SignalId,
    pub side: Side,
    pub status: SignalStatus,
    pub entry_price: Tick,
    pub exit_price: Tick,
    pub exit_time: Timestamp,
    pub elapsed_ms: i64,
    pub mfe_ticks: i64,
    pub mae_ticks: i64,
}

impl ResolvedOutcome {
    fn from_signal(signal: &Signal, exit_price: Tick, exit_time: Timestamp) -> Self {
        Self {
            signal_id: signal.id,
            side: signal.side,
            status: signal.status,
            entry_price: signal.entry_price,
            exit_price,
            exit_time,
            elapsed_ms: (exit_time - signal.timestamp).num_milliseconds(),
            mfe_ticks: signal.mfe_ticks,
            mae_ticks: signal.mae_ticks,
        }
    }

    /// Did the signal end up in profit? Timeouts count by their exit price.
    pub fn is_profitable(&self) -> bool {
        match self.status {
            SignalStatus::Profitable => true,
            SignalStatus::Unprofitable | SignalStatus::Open => false,
            SignalStatus::TimedOut => {
                self.side.favorable_ticks(self.entry_price, self.exit_price) > 0
            }
        }
    }

    /// Excursion record for the trade memory
    pub fn excursion(&self) -> TradeExcursion {
        TradeExcursion {
            side: self.side,
            entry_price: self.entry_price,
            mfe_ticks: self.mfe_ticks,
            mae_ticks: self.mae_ticks,
            profitable: self.is_profitable(),
            closed_at: self.exit_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeStats {
    pub open: usize,
    pub profitable: usize,
    pub unprofitable: usize,
    pub timed_out: usize,
}

pub struct OutcomeTracker {
    config: OutcomeConfig,
    signals: DashMap<SignalId, Signal>,
}

impl OutcomeTracker {
    pub fn new(config: OutcomeConfig) -> Self {
        Self {
            config,
            signals: DashMap::new(),
        }
    }

    pub fn config(&self) -> &OutcomeConfig {
        &self.config
    }

    /// Start following a dispatched signal
    pub fn track(&self, signal: Signal) {
        log::debug!(
            "[Outcome] Tracking signal {} ({} @ {})",
            signal.id,
            signal.side,
            signal.entry_price
        );
        self.signals.insert(signal.id, signal);
    }

    /// Update open signals with a trade print
    pub fn on_trade(&self, price: Tick, now: Timestamp) -> Vec<ResolvedOutcome> {
        self.sweep(price, now, true)
    }

    /// Resolve signals past the horizon at `price` without a new print
    pub fn check_timeouts(&self, price: Tick, now: Timestamp) -> Vec<ResolvedOutcome> {
        self.sweep(price, now, false)
    }

    fn sweep(&self, price: Tick, now: Timestamp, observe: bool) -> Vec<ResolvedOutcome> {
        let horizon = Duration::seconds(self.config.horizon_secs);
        let mut resolved = Vec::new();

        for mut entry in self.signals.iter_mut() {
            let signal = entry.value_mut();
            if !signal.is_open() {
                continue;
            }

            // Past the horizon a print no longer counts toward the excursion
            let status = if now - signal.timestamp >= horizon {
                SignalStatus::TimedOut
            } else if !observe {
                continue;
            } else {
                let moved = signal.observe(price);
                if moved >= self.config.significance_ticks {
                    SignalStatus::Profitable
                } else if -moved >= self.config.significance_ticks {
                    SignalStatus::Unprofitable
                } else {
                    continue;
                }
            };

            signal.resolve(status, price, now);
            let outcome = ResolvedOutcome::from_signal(signal, price, now);
            log::info!(
                "[Outcome] Signal {} {:?}: {} {} -> {} in {}ms (MFE {} / MAE {})",
                outcome.signal_id,
                outcome.status,
                outcome.side,
                outcome.entry_price,
                outcome.exit_price,
                outcome.elapsed_ms,
                outcome.mfe_ticks,
                outcome.mae_ticks
            );
            resolved.push(outcome);
        }

        self.purge(now);
        resolved
    }

    /// Drop resolved signals older than the retention period
    pub fn purge(&self, now: Timestamp) {
        let retention = Duration::seconds(self.config.retention_secs);
        self.signals.retain(|_, signal| match signal.exit_time {
            Some(exit) => now - exit < retention,
            None => true,
        });
    }

    pub fn get(&self, id: SignalId) -> Option<Signal> {
        self.signals.get(&id).map(|entry| entry.value().clone())
    }

    /// Cloned copy of every retained signal, oldest first
    pub fn snapshot(&self) -> Vec<Signal> {
        let mut signals: Vec<Signal> = self
            .signals
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        signals.sort_by_key(|s| s.id);
        signals
    }

    pub fn open_count(&self) -> usize {
        self.signals.iter().filter(|e| e.value().is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn stats(&self) -> OutcomeStats {
        let mut stats = OutcomeStats::default();
        for entry in self.signals.iter() {
            match entry.value().status {
                SignalStatus::Open => stats.open += 1,
                SignalStatus::Profitable => stats.profitable += 1,
                SignalStatus::Unprofitable => stats.unprofitable += 1,
                SignalStatus::TimedOut => stats.timed_out += 1,
            }
        }
        stats
    }
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        Self::new(OutcomeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berg_risk_manager::{RiskCalculator, RiskConfig, RiskInputs, TradeMemory};
    use berg_core::SessionPhase;
    use berg_indicators::IndicatorSuite;
    use berg_strategy::ScoreBreakdown;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
    }

    fn signal(id: SignalId, side: Side, entry: Tick) -> Signal {
        let suite = IndicatorSuite::default();
        let memory = TradeMemory::default();
        let risk = RiskCalculator::new(RiskConfig::default()).calculate(&RiskInputs {
            side,
            entry_price: entry,
            phase: SessionPhase::Midday,
            indicators: &suite,
            memory: &memory,
        });
        Signal::new(id, t0(), side, entry, 150, ScoreBreakdown::default(), risk)
    }

    #[test]
    fn test_profitable_move_resolves() {
        let _ = env_logger::try_init();
        let tracker = OutcomeTracker::default();
        tracker.track(signal(1, Side::Bid, 1000));

        assert!(tracker.on_trade(1004, t0() + Duration::seconds(10)).is_empty());
        assert!(tracker.on_trade(997, t0() + Duration::seconds(20)).is_empty());
        let resolved = tracker.on_trade(1010, t0() + Duration::seconds(42));

        assert_eq!(resolved.len(), 1);
        let outcome = &resolved[0];
        assert_eq!(outcome.status, SignalStatus::Profitable);
        assert_eq!(outcome.exit_price, 1010);
        assert_eq!(outcome.elapsed_ms, 42_000);
        assert_eq!(outcome.mfe_ticks, 10);
        assert_eq!(outcome.mae_ticks, 3);
        assert!(outcome.excursion().profitable);
        assert_eq!(tracker.open_count(), 0);
    }

    #[test]
    fn test_adverse_move_resolves_unprofitable() {
        let tracker = OutcomeTracker::default();
        tracker.track(signal(2, Side::Ask, 1000));

        let resolved = tracker.on_trade(1010, t0() + Duration::seconds(5));
        assert_eq!(resolved[0].status, SignalStatus::Unprofitable);
        assert_eq!(resolved[0].mae_ticks, 10);
        assert!(!resolved[0].is_profitable());
    }

    #[test]
    fn test_horizon_times_out() {
        let tracker = OutcomeTracker::default();
        tracker.track(signal(3, Side::Bid, 1000));

        assert!(tracker.on_trade(1003, t0() + Duration::seconds(299)).is_empty());
        let resolved = tracker.check_timeouts(1002, t0() + Duration::seconds(300));

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, SignalStatus::TimedOut);
        assert_eq!(resolved[0].exit_price, 1002);
        assert_eq!(resolved[0].elapsed_ms, 300_000);
        assert!(resolved[0].is_profitable());
    }

    #[test]
    fn test_late_print_times_out_instead_of_resolving() {
        let tracker = OutcomeTracker::default();
        tracker.track(signal(6, Side::Bid, 1000));

        assert!(tracker.on_trade(1004, t0() + Duration::seconds(60)).is_empty());
        let resolved = tracker.on_trade(1015, t0() + Duration::seconds(301));

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, SignalStatus::TimedOut);
        assert_eq!(resolved[0].exit_price, 1015);
        assert_eq!(resolved[0].mfe_ticks, 4);
        assert_eq!(tracker.stats().profitable, 0);
        assert_eq!(tracker.stats().timed_out, 1);
    }

    #[test]
    fn test_resolved_signals_are_purged_after_retention() {
        let tracker = OutcomeTracker::default();
        tracker.track(signal(4, Side::Bid, 1000));
        tracker.track(signal(5, Side::Bid, 1005));

        tracker.on_trade(1010, t0() + Duration::seconds(1));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.stats().profitable, 1);

        // Signal 5 times out at 300s; signal 4 is an hour past its exit
        tracker.check_timeouts(1005, t0() + Duration::seconds(3601));
        let remaining: Vec<SignalId> = tracker.snapshot().iter().map(|s| s.id).collect();
        assert_eq!(remaining, vec![5]);
        assert_eq!(tracker.get(5).map(|s| s.status), Some(SignalStatus::TimedOut));
    }
}
