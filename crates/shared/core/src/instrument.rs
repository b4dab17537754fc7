use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::values::Tick;

/// The single instrument the pipeline runs on
///
/// Prices travel through the pipeline as integer ticks; the tick size only
/// matters when converting back to quoted prices for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Minimum price increment in quote units
    pub tick_size: Decimal,
    /// Monetary value of one tick for one contract
    pub tick_value: Decimal,
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        Self {
            symbol: "ES".to_string(),
            tick_size: dec!(0.25),
            tick_value: dec!(12.5),
        }
    }
}

impl InstrumentSpec {
    /// Check the tick size is usable in price math
    pub fn validate(&self) -> CoreResult<()> {
        if self.tick_size <= Decimal::ZERO {
            return Err(CoreError::InvalidTickSize(format!(
                "{} has tick size {}",
                self.symbol, self.tick_size
            )));
        }
        Ok(())
    }

    /// Quoted price for a tick count (None if the tick size is unusable)
    pub fn price_of(&self, ticks: Tick) -> Option<Decimal> {
        if self.tick_size <= Decimal::ZERO {
            return None;
        }
        Some(Decimal::from(ticks) * self.tick_size)
    }
}
