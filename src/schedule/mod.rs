//! The `Schedule` capability and its three concrete variants.

pub mod constant_delay;
pub mod cron;
pub mod once;

pub use constant_delay::ConstantDelay;
pub use cron::CronSchedule;
pub use once::OnceSchedule;

use std::sync::Arc;

use chrono::{DateTime, Local};

/// A schedule's duty cycle: given an instant, name the next strictly-later
/// activation instant, or report that the schedule is exhausted.
///
/// `next` is invoked once when an entry is registered, and again each time
/// the entry fires — it is never invoked concurrently with itself for the
/// same entry, since the activation loop owns entries exclusively.
pub trait Schedule: Send + Sync {
    /// Return the next activation time strictly later than `after`, or
    /// `None` if the schedule can never fire again.
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>>;

    /// An independent copy of this schedule's current state, sharing no
    /// interior mutability with the original.
    ///
    /// [`crate::entry::Entry::to_snapshot`] calls this instead of cloning
    /// the `Arc` so that a snapshot handed to a caller is fully disjoint
    /// from engine state (`SPEC_FULL.md` §8 invariant 4) even for variants
    /// like [`OnceSchedule`] whose `next` mutates interior state through a
    /// shared reference.
    fn snapshot(&self) -> Arc<dyn Schedule>;
}

impl<S: Schedule + ?Sized> Schedule for Box<S> {
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        (**self).next(after)
    }

    fn snapshot(&self) -> Arc<dyn Schedule> {
        (**self).snapshot()
    }
}
