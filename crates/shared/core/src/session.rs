//! Trading session schedule
//!
//! Maps data-time to a session phase in the exchange's local time. Phase
//! drives the time-of-day confluence bonus and session-aware stop scaling.
//! Always call with feed timestamps, never wall-clock time, so replays see
//! the same phases as the live session did.

use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::Timestamp;

/// Phase of the trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    PreMarket,
    /// First minutes after the open (high activity)
    Opening,
    Midday,
    /// Last minutes before the close (high activity)
    Closing,
    AfterHours,
}

impl SessionPhase {
    /// Volatility scale applied to ATR-based risk distances
    pub fn volatility_scale(&self) -> Decimal {
        match self {
            SessionPhase::Opening => dec!(1.25),
            SessionPhase::Midday => dec!(0.85),
            SessionPhase::Closing => dec!(1.15),
            SessionPhase::PreMarket | SessionPhase::AfterHours => Decimal::ONE,
        }
    }

    /// Is this one of the high-participation phases?
    pub fn is_prime(&self) -> bool {
        matches!(self, SessionPhase::Opening | SessionPhase::Closing)
    }

    /// Is the regular session open?
    pub fn is_regular(&self) -> bool {
        matches!(
            self,
            SessionPhase::Opening | SessionPhase::Midday | SessionPhase::Closing
        )
    }
}

/// Regular trading hours in exchange-local time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSchedule {
    /// Exchange local time offset from UTC, in minutes (e.g. -300 for EST)
    pub utc_offset_minutes: i32,
    /// Regular session open (local)
    pub open: NaiveTime,
    /// Regular session close (local)
    pub close: NaiveTime,
    /// Length of the opening phase
    pub opening_minutes: i64,
    /// Length of the closing phase
    pub closing_minutes: i64,
}

impl Default for SessionSchedule {
    fn default() -> Self {
        Self {
            utc_offset_minutes: -300,
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            opening_minutes: 60,
            closing_minutes: 60,
        }
    }
}

impl SessionSchedule {
    /// Local wall time at the exchange for a UTC timestamp
    fn local(&self, ts: Timestamp) -> chrono::NaiveDateTime {
        ts.naive_utc() + Duration::minutes(self.utc_offset_minutes as i64)
    }

    /// Session phase at the given data-time
    pub fn phase(&self, ts: Timestamp) -> SessionPhase {
        let t = self.local(ts).time();
        if t < self.open {
            return SessionPhase::PreMarket;
        }
        if t >= self.close {
            return SessionPhase::AfterHours;
        }
        if t < self.open + Duration::minutes(self.opening_minutes) {
            SessionPhase::Opening
        } else if t >= self.close - Duration::minutes(self.closing_minutes) {
            SessionPhase::Closing
        } else {
            SessionPhase::Midday
        }
    }

    /// Local trading date, used to detect session rollover
    pub fn session_date(&self, ts: Timestamp) -> NaiveDate {
        self.local(ts).date()
    }
}
