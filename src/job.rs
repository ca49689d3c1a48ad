//! The callable an [`crate::Entry`] fires on each activation.

/// Work invoked by the engine when an entry's schedule comes due.
///
/// Mirrors the source's `Job` interface (`Run(int64)`): the only input a job
/// receives is its own entry id, and it returns nothing. Runtime errors are
/// opaque to the engine — a `Job` that needs to report failure should log it
/// itself; see `SPEC_FULL.md` §7.
pub trait Job: Send + Sync {
    /// Run the job. Invoked on a fresh `tokio::spawn`ed task; panics here are
    /// contained to that task and never observed by the engine.
    fn run(&self, id: u64);
}

/// Wraps a plain closure as a [`Job`], the same role `FuncJob` plays in the
/// source for `AddFunc`.
pub struct FuncJob<F>(pub F)
where
    F: Fn(u64) + Send + Sync;

impl<F> Job for FuncJob<F>
where
    F: Fn(u64) + Send + Sync,
{
    fn run(&self, id: u64) {
        (self.0)(id)
    }
}
