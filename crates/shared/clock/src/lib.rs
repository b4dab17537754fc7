//! Berg Clock Infrastructure
//!
//! Provides time sources for the pipeline:
//!
//! - [`DataClock`]: authoritative data-time from the feed (replay-safe)
//! - [`WallClock`]: what a [`DataClock`] answers with before data-time exists
//!
//! ## Usage
//!
//! ```ignore
//! use berg_clock::{Clock, DataClock};
//!
//! let clock = DataClock::new();
//! clock.advance(event.timestamp());
//! let now = clock.now(); // data-time, never the wall clock once set
//! ```

mod data;
mod wall;

pub use data::DataClock;
pub use wall::WallClock;

// Re-export the Clock trait for convenience
pub use berg_ports::Clock;
