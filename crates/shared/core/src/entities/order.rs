use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{Size, Tick, Timestamp};

/// Feed-assigned identifier for a resting order
pub type OrderId = u64;

/// Resting order as seen on the market-by-order feed
///
/// Owned by the order book aggregator: created on add, mutated in place on
/// replace (identity is preserved), dropped on cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    /// Limit price in ticks
    pub price: Tick,
    pub size: Size,
    pub inserted_at: Timestamp,
}

impl Order {
    /// Create a new resting order
    pub fn new(id: OrderId, side: Side, price: Tick, size: Size, inserted_at: Timestamp) -> Self {
        Self {
            id,
            side,
            price,
            size,
            inserted_at,
        }
    }

    /// Create a bid order
    pub fn bid(id: OrderId, price: Tick, size: Size, inserted_at: Timestamp) -> Self {
        Self::new(id, Side::Bid, price, size, inserted_at)
    }

    /// Create an ask order
    pub fn ask(id: OrderId, price: Tick, size: Size, inserted_at: Timestamp) -> Self {
        Self::new(id, Side::Ask, price, size, inserted_at)
    }
}
