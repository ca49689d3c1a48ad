//! One-shot schedule: fires exactly once at a fixed instant.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};

use super::Schedule;

/// A schedule that fires once at `scheduled_time` and never again.
///
/// `next` takes `&self`, so the "already fired" bookkeeping is an
/// [`AtomicBool`] rather than a plain `bool` field — the engine holds entries
/// behind a shared `Schedule` capability, not `&mut`.
#[derive(Debug)]
pub struct OnceSchedule {
    scheduled_time: DateTime<Local>,
    fired: AtomicBool,
}

impl OnceSchedule {
    pub fn new(scheduled_time: DateTime<Local>) -> Self {
        Self {
            scheduled_time,
            fired: AtomicBool::new(false),
        }
    }
}

impl Schedule for OnceSchedule {
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        if after < self.scheduled_time && !self.fired.swap(true, Ordering::SeqCst) {
            return Some(self.scheduled_time);
        }
        None
    }

    /// `fired` is interior-mutable state shared through `&self`, so a plain
    /// `Arc::clone` would let a caller's snapshot perturb the live entry by
    /// calling `next` on it. Copy the current `fired` value into a fresh
    /// `AtomicBool` instead of sharing the original.
    fn snapshot(&self) -> std::sync::Arc<dyn Schedule> {
        std::sync::Arc::new(OnceSchedule {
            scheduled_time: self.scheduled_time,
            fired: AtomicBool::new(self.fired.load(Ordering::SeqCst)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn fires_once_then_never_again() {
        let at = t(2020, 1, 1, 12, 0, 0);
        let s = OnceSchedule::new(at);
        assert_eq!(s.next(at - Duration::seconds(1)), Some(at));
        assert_eq!(s.next(at - Duration::seconds(1)), None);
    }

    #[test]
    fn returns_none_when_after_is_not_before_scheduled_time() {
        let at = t(2020, 1, 1, 12, 0, 0);
        let s = OnceSchedule::new(at);
        assert_eq!(s.next(at), None);
        assert_eq!(s.next(at + Duration::seconds(1)), None);
    }

    #[test]
    fn snapshot_does_not_share_fired_state_with_the_original() {
        let at = t(2020, 1, 1, 12, 0, 0);
        let s = OnceSchedule::new(at);
        let before_fire = at - Duration::seconds(1);

        let copy = s.snapshot();
        // Firing the snapshot must not consume the original's one shot.
        assert_eq!(copy.next(before_fire), Some(at));
        assert_eq!(s.next(before_fire), Some(at));
    }
}
