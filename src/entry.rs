//! The unit the engine manages: a schedule paired with a job, plus
//! bookkeeping the activation loop maintains as it fires.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::job::Job;
use crate::schedule::Schedule;

/// One scheduled job, owned exclusively by the engine.
///
/// `schedule` and `job` are `Arc`s rather than `Box`es. `job` is handed to
/// [`EntrySnapshot`] via a plain `Arc::clone`: running it from a snapshot
/// invokes the same callable the engine would invoke, with no engine state
/// behind it to perturb. `schedule` is not shared this way — some variants
/// (e.g. [`crate::schedule::OnceSchedule`]) mutate interior state through
/// `&self` on every `next` call, so sharing the `Arc` would let a caller's
/// snapshot fire-consume the live entry's schedule. [`Entry::to_snapshot`]
/// instead calls [`crate::schedule::Schedule::snapshot`] for an independent
/// copy, keeping the snapshot fully disjoint from engine state
/// (invariant 4 of `SPEC_FULL.md` §8).
pub(crate) struct Entry {
    pub(crate) id: u64,
    pub(crate) schedule: Arc<dyn Schedule>,
    pub(crate) job: Arc<dyn Job>,
    /// Time of next firing. `None` means "never computed yet" or "schedule
    /// exhausted" — spec.md's "zero instant" sentinel.
    pub(crate) next: Option<DateTime<Local>>,
    /// Time of most recent firing. `None` means never fired.
    pub(crate) prev: Option<DateTime<Local>>,
}

impl Entry {
    pub(crate) fn to_snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            id: self.id,
            schedule: self.schedule.snapshot(),
            job: Arc::clone(&self.job),
            next: self.next,
            prev: self.prev,
        }
    }
}

/// An owned, point-in-time copy of one [`Entry`], returned by
/// [`crate::engine::Engine::entries`].
///
/// Unlike the source this crate is grounded on, `id` is retained here
/// (`SPEC_FULL.md` §9 Open Question #2): callers need it to target
/// [`crate::engine::Engine::del_job`] on what they observe in a snapshot.
#[derive(Clone)]
pub struct EntrySnapshot {
    pub id: u64,
    pub schedule: Arc<dyn Schedule>,
    pub job: Arc<dyn Job>,
    pub next: Option<DateTime<Local>>,
    pub prev: Option<DateTime<Local>>,
}

/// `byTime`: two `None`s compare equal; `None` sorts after any `Some`;
/// otherwise earliest first.
pub(crate) fn cmp_by_next(a: &Entry, b: &Entry) -> Ordering {
    match (a.next, b.next) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}
