//! Order Manager errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Decision service {service} failed: {reason}")]
    DecisionService { service: String, reason: String },

    #[error("Decision service {service} timed out after {timeout_ms} ms")]
    DecisionTimeout { service: String, timeout_ms: u64 },

    #[error("Decision service {service} panicked: {reason}")]
    DecisionPanicked { service: String, reason: String },

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Decision event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
