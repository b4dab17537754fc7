//! Berg Ports
//!
//! Port definitions (traits) for the Berg signal pipeline.
//! These define the boundaries between domain logic and the host platform.

mod clock;
mod market_data;

pub use clock::Clock;
pub use market_data::MarketDataHandler;
