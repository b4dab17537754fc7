//! Engine configuration
//!
//! One JSON document with a section per component. Every section has
//! defaults, so a file only needs the values it changes.

use berg_core::{InstrumentSpec, SessionSchedule};
use berg_indicators::IndicatorConfig;
use berg_order_manager::{OrchestratorConfig, OutcomeConfig};
use berg_risk_manager::RiskConfig;
use berg_strategy::{ConfluenceConfig, ConfluenceWeights, IcebergConfig, ThresholdConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Something in the configuration that will run, but probably not as intended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: InstrumentSpec,
    pub session: SessionSchedule,
    pub indicators: IndicatorConfig,
    pub thresholds: ThresholdConfig,
    pub iceberg: IcebergConfig,
    pub confluence: ConfluenceConfig,
    pub weights: ConfluenceWeights,
    pub risk: RiskConfig,
    pub orchestrator: OrchestratorConfig,
    pub outcome: OutcomeConfig,
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// The embedded default configuration
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(include_str!("default_config.json"))
    }

    /// Check for values that would silently misbehave
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = self.instrument.validate() {
            warnings.push(ConfigWarning::new("instrument.tick_size", e.to_string()));
        }
        if self.session.open >= self.session.close {
            warnings.push(ConfigWarning::new(
                "session",
                format!("open {} is not before close {}", self.session.open, self.session.close),
            ));
        }
        if self.indicators.bar_interval_secs <= 0 {
            warnings.push(ConfigWarning::new(
                "indicators.bar_interval_secs",
                "must be positive, bars will not close",
            ));
        }
        if self.indicators.ema_periods.contains(&0) {
            warnings.push(ConfigWarning::new("indicators.ema_periods", "zero-length period"));
        }
        if self.indicators.atr_period == 0 {
            warnings.push(ConfigWarning::new("indicators.atr_period", "zero-length period"));
        }
        if self.thresholds.window == 0 {
            warnings.push(ConfigWarning::new(
                "thresholds.window",
                "zero-length window, treated as 1",
            ));
        }
        if self.risk.memory_trades == 0 {
            warnings.push(ConfigWarning::new(
                "risk.memory_trades",
                "zero-length memory, treated as 1",
            ));
        }
        if self.risk.min_reward_risk < Decimal::ONE {
            warnings.push(ConfigWarning::new(
                "risk.min_reward_risk",
                format!("{} accepts targets closer than stops", self.risk.min_reward_risk),
            ));
        }
        if self.risk.min_stop_ticks > self.risk.max_stop_ticks {
            warnings.push(ConfigWarning::new(
                "risk.min_stop_ticks",
                format!(
                    "minimum stop {} exceeds maximum {}",
                    self.risk.min_stop_ticks, self.risk.max_stop_ticks
                ),
            ));
        }
        if !(0..=100).contains(&self.orchestrator.decision_threshold) {
            warnings.push(ConfigWarning::new(
                "orchestrator.decision_threshold",
                format!("{} will be clamped to [0, 100]", self.orchestrator.decision_threshold),
            ));
        }
        if self.orchestrator.decision_timeout_ms == 0 {
            warnings.push(ConfigWarning::new(
                "orchestrator.decision_timeout_ms",
                "every decision call will time out",
            ));
        }
        if self.orchestrator.max_open_positions == 0 {
            warnings.push(ConfigWarning::new(
                "orchestrator.max_open_positions",
                "no signal can ever be dispatched",
            ));
        }
        if self.outcome.significance_ticks <= 0 {
            warnings.push(ConfigWarning::new(
                "outcome.significance_ticks",
                "signals resolve on the first trade",
            ));
        }
        if self.outcome.horizon_secs <= 0 {
            warnings.push(ConfigWarning::new(
                "outcome.horizon_secs",
                "signals time out immediately",
            ));
        }

        warnings
    }

    /// Validate and log every warning
    pub fn log_warnings(&self) -> usize {
        let warnings = self.validate();
        for warning in &warnings {
            log::warn!("[Config] {}", warning);
        }
        warnings.len()
    }
}
