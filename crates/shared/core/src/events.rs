//! Feed Events - Ordered market data stream for one instrument
//!
//! The host feed delivers order-level events, trade prints, book-update
//! markers and authoritative data-time ticks in a single ordered stream.
//! Consumers must process them strictly in arrival order.

use serde::{Deserialize, Serialize};

use crate::entities::{Order, OrderId, Trade};
use crate::values::{Size, Tick, Timestamp};

/// One event from the market data feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A new resting order entered the book
    OrderAdd { order: Order },
    /// A resting order changed price and/or size (identity preserved)
    OrderReplace {
        order_id: OrderId,
        price: Tick,
        size: Size,
        timestamp: Timestamp,
    },
    /// A resting order left the book
    OrderCancel {
        order_id: OrderId,
        timestamp: Timestamp,
    },
    /// A trade print
    Trade { trade: Trade },
    /// End of a batch of book changes
    BookUpdate { timestamp: Timestamp },
    /// Authoritative data-time from the feed
    Time { timestamp: Timestamp },
}

impl FeedEvent {
    /// Create an order add event
    pub fn add(order: Order) -> Self {
        FeedEvent::OrderAdd { order }
    }

    /// Create a trade event
    pub fn trade(trade: Trade) -> Self {
        FeedEvent::Trade { trade }
    }

    /// Create a book update marker
    pub fn book_update(timestamp: Timestamp) -> Self {
        FeedEvent::BookUpdate { timestamp }
    }

    /// Data-time carried by this event
    pub fn timestamp(&self) -> Timestamp {
        match self {
            FeedEvent::OrderAdd { order } => order.inserted_at,
            FeedEvent::OrderReplace { timestamp, .. } => *timestamp,
            FeedEvent::OrderCancel { timestamp, .. } => *timestamp,
            FeedEvent::Trade { trade } => trade.timestamp,
            FeedEvent::BookUpdate { timestamp } => *timestamp,
            FeedEvent::Time { timestamp } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Side;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_feed_event_json_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let event = FeedEvent::add(Order::new(7, Side::Bid, 1000, 5, ts));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"order_add\""));
        assert!(json.contains("\"side\":\"bid\""));

        let parsed: FeedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.timestamp(), ts);
    }

    #[test]
    fn test_cancel_from_json() {
        let json = r#"{"type":"order_cancel","order_id":42,"timestamp":"2024-03-01T14:30:00Z"}"#;
        let event: FeedEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, FeedEvent::OrderCancel { order_id: 42, .. }));
    }
}
