use berg_core::Timestamp;
use berg_ports::Clock;
use chrono::Utc;

/// Wall clock, the default stand-in before the feed supplies data-time
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "WallClock"
    }
}
