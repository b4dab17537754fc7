use thiserror::Error;

use crate::entities::OrderId;

/// Domain-level errors for core types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid tick size: {0}")]
    InvalidTickSize(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
