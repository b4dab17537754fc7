//! Microstructure detectors
//!
//! Four independent detectors over the trade stream, each queried at
//! signal time by the confluence scorer.

pub mod big_fish;
pub mod stop_hunt;
pub mod tape_speed;
pub mod volume_tail;

pub use big_fish::{BigFishConfig, BigFishDetector, BigFishSignal};
pub use stop_hunt::{KeyLevelKind, StopHunt, StopHuntConfig, StopHuntDetector};
pub use tape_speed::{SpeedLevel, TapeCondition, TapeReading, TapeSpeedConfig, TapeSpeedTracker};
pub use volume_tail::{Tail, TailBias, TailReading, VolumeTailConfig, VolumeTailDetector};
