use berg_core::{FeedEvent, Order, OrderId, Size, Tick, Timestamp, Trade};

/// Port for the consumed market data feed
///
/// The host platform calls these in strict arrival order. Implementors must
/// not reorder: several accumulators downstream are order-sensitive.
pub trait MarketDataHandler {
    /// A new resting order
    fn on_order_add(&mut self, order: Order);

    /// A resting order changed price and/or size
    fn on_order_replace(&mut self, order_id: OrderId, price: Tick, size: Size, timestamp: Timestamp);

    /// A resting order was cancelled
    fn on_order_cancel(&mut self, order_id: OrderId, timestamp: Timestamp);

    /// A trade print
    fn on_trade(&mut self, trade: Trade);

    /// End of a batch of book changes
    fn on_book_update(&mut self, timestamp: Timestamp);

    /// Authoritative data-time
    fn on_time(&mut self, timestamp: Timestamp);

    /// Dispatch a feed event to the matching callback
    fn handle(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::OrderAdd { order } => self.on_order_add(order),
            FeedEvent::OrderReplace {
                order_id,
                price,
                size,
                timestamp,
            } => self.on_order_replace(order_id, price, size, timestamp),
            FeedEvent::OrderCancel {
                order_id,
                timestamp,
            } => self.on_order_cancel(order_id, timestamp),
            FeedEvent::Trade { trade } => self.on_trade(trade),
            FeedEvent::BookUpdate { timestamp } => self.on_book_update(timestamp),
            FeedEvent::Time { timestamp } => self.on_time(timestamp),
        }
    }
}
