use berg_core::Timestamp;

/// Port for the pipeline's notion of "now"
///
/// Cooldowns, warm-up, session phase and outcome horizons all read time
/// through this trait. A feed-backed clock returns data-time; the wall clock
/// only stands in until the feed has delivered a timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Does `now()` come from the feed rather than the wall clock?
    fn is_data_time(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "Clock"
    }
}
