//! Berg Core Domain
//!
//! Pure domain types for the Berg signal pipeline.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod events;
pub mod instrument;
pub mod session;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Aggressor, Order, OrderId, Side, Trade};
pub use error::{CoreError, CoreResult};
pub use events::FeedEvent;
pub use instrument::InstrumentSpec;
pub use session::{SessionPhase, SessionSchedule};
pub use values::{Size, Tick, Timestamp};
