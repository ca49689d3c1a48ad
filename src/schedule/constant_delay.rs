//! Fixed-interval schedule, produced by `@every <duration>`.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::time::Duration;

use crate::error::DurationParseError;
use crate::time_util::floor_to_second;

use super::Schedule;

/// A schedule that fires every `delay`, rounded down to whole seconds at
/// construction (minimum one second).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantDelay {
    delay: ChronoDuration,
}

impl ConstantDelay {
    /// Build a `ConstantDelay` from a `Duration`, rounding down to whole
    /// seconds. Fails if the rounded delay is zero (construction requires a
    /// positive interval; spec.md calls zero/negative "invalid").
    pub fn new(delay: Duration) -> Result<Self, DurationParseError> {
        let secs = delay.as_secs();
        if secs == 0 {
            return Err(DurationParseError::NonPositive);
        }
        Ok(Self {
            delay: ChronoDuration::seconds(secs as i64),
        })
    }

    /// The rounded delay this schedule fires at.
    pub fn delay(&self) -> ChronoDuration {
        self.delay
    }
}

/// Convenience constructor mirroring the source's top-level `Every(d)`.
pub fn every(delay: Duration) -> Result<ConstantDelay, DurationParseError> {
    ConstantDelay::new(delay)
}

impl Schedule for ConstantDelay {
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        Some(floor_to_second(after) + self.delay)
    }

    fn snapshot(&self) -> std::sync::Arc<dyn Schedule> {
        std::sync::Arc::new(*self)
    }
}
