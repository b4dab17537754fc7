//! Time bars built from the trade stream
//!
//! ATR consumes high/low/close triplets and the EMAs consume closes, so both
//! are driven from fixed-interval bars rather than individual prints.

use berg_core::{Size, Tick, Timestamp, Trade};
use chrono::{DateTime, Duration};
use serde::{Deserialize, Serialize};

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bar interval
    pub start: Timestamp,
    pub open: Tick,
    pub high: Tick,
    pub low: Tick,
    pub close: Tick,
    pub volume: Size,
}

impl Bar {
    fn open_with(start: Timestamp, trade: &Trade) -> Self {
        Self {
            start,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.size,
        }
    }

    fn absorb(&mut self, trade: &Trade) {
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume += trade.size;
    }

    /// High - low in ticks
    pub fn range(&self) -> i64 {
        self.high - self.low
    }
}

/// Aggregates trades into interval-aligned bars
#[derive(Debug, Clone)]
pub struct BarBuilder {
    interval_ns: i64,
    current: Option<Bar>,
}

impl BarBuilder {
    /// Create a builder; intervals shorter than one second are raised to one second
    pub fn new(interval: Duration) -> Self {
        let interval_ns = interval
            .num_nanoseconds()
            .unwrap_or(i64::MAX)
            .max(1_000_000_000);
        Self {
            interval_ns,
            current: None,
        }
    }

    fn bucket_start(&self, ts: Timestamp) -> Timestamp {
        let nanos = ts.timestamp_nanos_opt().unwrap_or(0);
        let aligned = nanos - nanos.rem_euclid(self.interval_ns);
        DateTime::from_timestamp_nanos(aligned)
    }

    /// Feed a trade; returns the previous bar once a trade lands in a new interval
    pub fn update(&mut self, trade: &Trade) -> Option<Bar> {
        let start = self.bucket_start(trade.timestamp);
        if let Some(bar) = self.current.as_mut() {
            if bar.start == start {
                bar.absorb(trade);
                return None;
            }
        }
        self.current.replace(Bar::open_with(start, trade))
    }

    /// Bar still being built
    pub fn current(&self) -> Option<&Bar> {
        self.current.as_ref()
    }

    /// Drop the bar in progress
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_bar_rollover() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 10).unwrap();
        let mut builder = BarBuilder::new(Duration::seconds(60));

        assert!(builder.update(&Trade::buy(100, 2, t0)).is_none());
        assert!(builder.update(&Trade::sell(97, 1, t0 + Duration::seconds(5))).is_none());
        assert!(builder.update(&Trade::buy(103, 4, t0 + Duration::seconds(20))).is_none());

        let closed = builder
            .update(&Trade::buy(101, 1, t0 + Duration::seconds(55)))
            .expect("bar should close on new interval");
        assert_eq!(closed.start, Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap());
        assert_eq!((closed.open, closed.high, closed.low, closed.close), (100, 103, 97, 103));
        assert_eq!(closed.volume, 7);
        assert_eq!(closed.range(), 6);
        assert_eq!(builder.current().map(|b| b.open), Some(101));
    }
}
