use berg_core::Timestamp;
use berg_ports::Clock;
use chrono::DateTime;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::wall::WallClock;

const UNSET: i64 = i64::MIN;

/// Feed-driven clock
///
/// Tracks the authoritative data-time supplied by the market data feed.
/// Until the first data timestamp arrives `now()` answers from a fallback
/// clock ([`WallClock`] unless one is supplied). Once any data timestamp has
/// been observed, `now()` never consults the fallback again, which keeps
/// cooldowns and session phases identical between replay and live runs. Time
/// never moves backwards: stale timestamps are ignored.
pub struct DataClock {
    nanos: AtomicI64,
    fallback: Box<dyn Clock>,
}

impl DataClock {
    /// Create a clock with no data-time yet
    pub fn new() -> Self {
        Self::with_fallback(WallClock)
    }

    /// Create a clock that answers from `fallback` until data-time arrives
    pub fn with_fallback(fallback: impl Clock + 'static) -> Self {
        Self {
            nanos: AtomicI64::new(UNSET),
            fallback: Box::new(fallback),
        }
    }

    /// Create a clock already pinned at `ts`
    pub fn starting_at(ts: Timestamp) -> Self {
        let clock = Self::new();
        clock.advance(ts);
        clock
    }

    /// Feed a data timestamp; returns the clock's time afterwards
    pub fn advance(&self, ts: Timestamp) -> Timestamp {
        let Some(incoming) = ts.timestamp_nanos_opt() else {
            log::warn!("[DataClock] Timestamp {} out of range, ignored", ts);
            return self.now();
        };
        let previous = self.nanos.fetch_max(incoming, Ordering::AcqRel);
        if previous != UNSET && incoming < previous {
            log::debug!("[DataClock] Ignoring stale timestamp {}", ts);
        }
        self.now()
    }

    /// Has the feed supplied any data-time yet?
    pub fn has_data_time(&self) -> bool {
        self.nanos.load(Ordering::Acquire) != UNSET
    }
}

impl Default for DataClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for DataClock {
    fn now(&self) -> Timestamp {
        match self.nanos.load(Ordering::Acquire) {
            UNSET => self.fallback.now(),
            nanos => DateTime::from_timestamp_nanos(nanos),
        }
    }

    fn is_data_time(&self) -> bool {
        self.has_data_time()
    }

    fn name(&self) -> &str {
        "DataClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    struct Pinned(Timestamp);

    impl Clock for Pinned {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    #[test]
    fn test_data_time_is_authoritative() {
        let clock = DataClock::new();
        assert!(!clock.has_data_time());

        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 15, 0, 0).unwrap();
        clock.advance(ts);
        assert!(clock.has_data_time());
        assert_eq!(clock.now(), ts);
        // Still the data time, not the wall clock
        assert_eq!(clock.now(), ts);
    }

    #[test]
    fn test_never_moves_backwards() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 15, 0, 0).unwrap();
        let clock = DataClock::starting_at(ts);

        clock.advance(ts - Duration::seconds(5));
        assert_eq!(clock.now(), ts);

        clock.advance(ts + Duration::seconds(1));
        assert_eq!(clock.now(), ts + Duration::seconds(1));
    }

    #[test]
    fn test_fallback_only_before_data_time() {
        let boot = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let clock = DataClock::with_fallback(Pinned(boot));
        assert_eq!(clock.now(), boot);
        assert!(!clock.is_data_time());

        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 15, 0, 0).unwrap();
        clock.advance(ts);
        assert!(clock.is_data_time());
        assert_eq!(clock.now(), ts);
    }
}
