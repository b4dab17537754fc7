use serde::{Deserialize, Serialize};

use super::Aggressor;
use crate::values::{Size, Tick, Timestamp};

/// Trade print from the tape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub price: Tick,
    pub size: Size,
    pub aggressor: Aggressor,
    pub timestamp: Timestamp,
}

impl Trade {
    /// Create a new trade print
    pub fn new(price: Tick, size: Size, aggressor: Aggressor, timestamp: Timestamp) -> Self {
        Self {
            price,
            size,
            aggressor,
            timestamp,
        }
    }

    /// Buy-aggressor print (lifted the offer)
    pub fn buy(price: Tick, size: Size, timestamp: Timestamp) -> Self {
        Self::new(price, size, Aggressor::Buy, timestamp)
    }

    /// Sell-aggressor print (hit the bid)
    pub fn sell(price: Tick, size: Size, timestamp: Timestamp) -> Self {
        Self::new(price, size, Aggressor::Sell, timestamp)
    }

    /// Signed volume: +size for buy aggressor, -size for sell aggressor
    pub fn signed_size(&self) -> i64 {
        self.size as i64 * self.aggressor.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_signed_size() {
        let now = Utc::now();
        assert_eq!(Trade::buy(100, 7, now).signed_size(), 7);
        assert_eq!(Trade::sell(100, 7, now).signed_size(), -7);
    }
}
