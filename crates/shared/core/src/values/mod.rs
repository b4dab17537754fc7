use chrono::{DateTime, Utc};

/// Price expressed as an integer number of ticks
pub type Tick = i64;

/// Order or trade size in whole contracts/units
pub type Size = u64;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
