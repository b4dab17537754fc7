//! Decision payloads and the external collaborator ports
//!
//! The decision service sees a snapshot of the signal (score breakdown,
//! risk parameters with quality metadata) plus session context, and answers
//! take or skip with optional threshold/weight adjustments. Adjustments are
//! explicit sub-records, applied through bounds-checked setters.

use async_trait::async_trait;
use berg_core::{SessionPhase, Side, Size, Timestamp};
use berg_indicators::IndicatorValues;
use berg_strategy::WeightKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::signal::{Signal, SignalId};

/// Market and session state sent alongside a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub data_time: Timestamp,
    pub phase: SessionPhase,
    pub trades_processed: u64,
    /// Score the orchestrator currently asks for
    pub decision_threshold: i32,
    /// (order count, size) the iceberg detector is using
    pub iceberg_thresholds: (usize, Size),
    pub open_positions: usize,
    /// Share of remembered signals that resolved profitable
    pub recent_win_rate: Option<Decimal>,
    pub indicators: IndicatorValues,
}

/// One call to the decision service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub request_id: Uuid,
    pub signal: Signal,
    pub context: SessionContext,
}

impl DecisionRequest {
    pub fn new(signal: Signal, context: SessionContext) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            signal,
            context,
        }
    }

    /// JSON rendering for services that take a text payload
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Take,
    Skip,
}

/// Requested iceberg thresholds (absolute values)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdAdjustment {
    pub order_count: Option<usize>,
    pub size: Option<Size>,
}

/// Requested confluence weights (absolute values)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightAdjustment {
    pub changes: Vec<(WeightKey, i32)>,
}

/// The decision service's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    /// 0-1
    pub confidence: Decimal,
    pub stop_loss_ticks: Option<i64>,
    pub take_profit_ticks: Option<i64>,
    pub reasoning: String,
    #[serde(default)]
    pub threshold_adjustment: Option<ThresholdAdjustment>,
    #[serde(default)]
    pub weight_adjustment: Option<WeightAdjustment>,
    /// New score the orchestrator should ask for
    #[serde(default)]
    pub decision_threshold: Option<i32>,
}

impl Decision {
    pub fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Skip,
            confidence: Decimal::ZERO,
            stop_loss_ticks: None,
            take_profit_ticks: None,
            reasoning: reasoning.into(),
            threshold_adjustment: None,
            weight_adjustment: None,
            decision_threshold: None,
        }
    }

    pub fn take(confidence: Decimal, reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Take,
            confidence,
            ..Self::skip(reasoning)
        }
    }

    pub fn with_levels(mut self, stop_loss_ticks: i64, take_profit_ticks: i64) -> Self {
        self.stop_loss_ticks = Some(stop_loss_ticks);
        self.take_profit_ticks = Some(take_profit_ticks);
        self
    }

    pub fn has_adjustments(&self) -> bool {
        self.threshold_adjustment.is_some()
            || self.weight_adjustment.is_some()
            || self.decision_threshold.is_some()
    }
}

/// What the execution collaborator receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub request_id: Uuid,
    pub signal_id: SignalId,
    pub action: DecisionAction,
    pub side: Side,
    pub confidence: Decimal,
    pub stop_loss_ticks: i64,
    pub take_profit_ticks: i64,
    pub reasoning: String,
}

impl TradeDecision {
    /// Combine a decision with its signal; levels fall back to the signal's risk parameters
    pub fn from_decision(request: &DecisionRequest, decision: &Decision) -> Self {
        let signal = &request.signal;
        Self {
            request_id: request.request_id,
            signal_id: signal.id,
            action: decision.action,
            side: signal.side,
            confidence: decision.confidence.clamp(Decimal::ZERO, Decimal::ONE),
            stop_loss_ticks: decision.stop_loss_ticks.unwrap_or(signal.risk.stop_ticks),
            take_profit_ticks: decision.take_profit_ticks.unwrap_or(signal.risk.target_ticks),
            reasoning: decision.reasoning.clone(),
        }
    }
}

/// Port: the external decision function
#[async_trait]
pub trait DecisionService: Send + Sync {
    /// Evaluate one signal
    async fn evaluate(&self, request: &DecisionRequest) -> Result<Decision>;

    fn name(&self) -> &str {
        "DecisionService"
    }
}

/// Port: the execution collaborator
pub trait ExecutionSink: Send + Sync {
    fn execute(&self, decision: &TradeDecision);
}

/// Reported back to the event thread when a decision call ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionEvent {
    Resolved {
        request_id: Uuid,
        signal_id: SignalId,
        decision: Decision,
    },
    Failed {
        request_id: Uuid,
        signal_id: SignalId,
        error: crate::error::Error,
    },
}
