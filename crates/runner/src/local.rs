//! Local collaborators for replay
//!
//! A decision service that needs nothing but the request itself, and an
//! execution sink that only logs. Enough to run a recorded session end to
//! end without an external decision function or a broker.

use async_trait::async_trait;
use berg_order_manager::{
    Decision, DecisionRequest, DecisionService, ExecutionSink, Result, TradeDecision,
};
use rust_decimal::Decimal;
use std::sync::Mutex;

/// Takes any signal scoring at or above the session's decision threshold
/// whose risk parameters were accepted as-is
#[derive(Debug, Clone, Default)]
pub struct ScoreThresholdService {
    /// Also take signals whose stop/target had to be forced
    pub allow_forced: bool,
}

impl ScoreThresholdService {
    pub fn new(allow_forced: bool) -> Self {
        Self { allow_forced }
    }
}

#[async_trait]
impl DecisionService for ScoreThresholdService {
    async fn evaluate(&self, request: &DecisionRequest) -> Result<Decision> {
        let signal = &request.signal;
        let threshold = request.context.decision_threshold;

        if signal.score < threshold {
            return Ok(Decision::skip(format!(
                "score {} below threshold {}",
                signal.score, threshold
            )));
        }
        if !signal.risk.accepted && !self.allow_forced {
            return Ok(Decision::skip(format!(
                "risk not accepted: {}",
                signal.risk.quality.explanation
            )));
        }

        let confidence = (Decimal::from(signal.score) / Decimal::from(100))
            .clamp(Decimal::ZERO, Decimal::ONE);
        Ok(Decision::take(
            confidence,
            format!(
                "score {} >= {}, R:R {}",
                signal.score,
                threshold,
                signal.risk.reward_risk.round_dp(2)
            ),
        )
        .with_levels(signal.risk.stop_ticks, signal.risk.target_ticks))
    }

    fn name(&self) -> &str {
        "score-threshold"
    }
}

/// Logs every decision and keeps them for the final report
#[derive(Debug, Default)]
pub struct LoggingSink {
    decisions: Mutex<Vec<TradeDecision>>,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> Vec<TradeDecision> {
        self.decisions
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl ExecutionSink for LoggingSink {
    fn execute(&self, decision: &TradeDecision) {
        log::info!(
            "[Execution] {:?} {} signal {} (confidence {}, SL {} / TP {}): {}",
            decision.action,
            decision.side,
            decision.signal_id,
            decision.confidence,
            decision.stop_loss_ticks,
            decision.take_profit_ticks,
            decision.reasoning
        );
        if let Ok(mut decisions) = self.decisions.lock() {
            decisions.push(decision.clone());
        }
    }
}
