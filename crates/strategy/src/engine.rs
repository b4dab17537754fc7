//! Iceberg Engine
//!
//! Wires the order book aggregator, adaptive thresholds and iceberg
//! detector together. Order events update the book (and, for adds, the
//! threshold statistics); a book update evaluates every level touched
//! since the previous one.

use berg_core::{Order, OrderId, Size, Tick, Timestamp};

use crate::iceberg::{IcebergCandidate, IcebergConfig, IcebergDetector};
use crate::orderbook::OrderBookAggregator;
use crate::thresholds::{AdaptiveThresholds, ThresholdConfig};

#[derive(Debug, Clone)]
pub struct IcebergEngine {
    book: OrderBookAggregator,
    thresholds: AdaptiveThresholds,
    detector: IcebergDetector,
}

impl IcebergEngine {
    pub fn new(thresholds: ThresholdConfig, iceberg: IcebergConfig) -> Self {
        Self {
            book: OrderBookAggregator::new(),
            thresholds: AdaptiveThresholds::new(thresholds),
            detector: IcebergDetector::new(iceberg),
        }
    }

    pub fn on_add(&mut self, order: Order) {
        let level = self.book.on_add(order);
        self.thresholds.observe(&level);
    }

    pub fn on_replace(&mut self, order_id: OrderId, price: Tick, size: Size, timestamp: Timestamp) {
        self.book.on_replace(order_id, price, size, timestamp);
    }

    pub fn on_cancel(&mut self, order_id: OrderId, timestamp: Timestamp) {
        self.book.on_cancel(order_id, timestamp);
    }

    /// End of a batch: evaluate touched levels, in first-touch order
    pub fn on_book_update(&mut self, now: Timestamp) -> Vec<IcebergCandidate> {
        let thresholds = self.thresholds.current();
        self.book
            .take_touched()
            .iter()
            .filter_map(|level| self.detector.evaluate(level, thresholds, now))
            .collect()
    }

    pub fn book(&self) -> &OrderBookAggregator {
        &self.book
    }

    pub fn thresholds(&self) -> &AdaptiveThresholds {
        &self.thresholds
    }

    pub fn thresholds_mut(&mut self) -> &mut AdaptiveThresholds {
        &mut self.thresholds
    }

    pub fn detector(&self) -> &IcebergDetector {
        &self.detector
    }
}

impl Default for IcebergEngine {
    fn default() -> Self {
        Self::new(ThresholdConfig::default(), IcebergConfig::default())
    }
}
