//! The scheduler engine: owns the entry list, runs the activation loop on a
//! dedicated task, and exposes the control surface described in
//! `SPEC_FULL.md` §4.5.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration as ChronoDuration, Local};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::entry::{cmp_by_next, Entry, EntrySnapshot};
use crate::error::ParseError;
use crate::job::{FuncJob, Job};
use crate::schedule::cron::{self, ParsedSchedule};
use crate::schedule::{OnceSchedule, Schedule};

/// "Effectively infinite" wait used when no entry is due: the activation
/// loop still needs *some* deadline to select on so that an `add` arriving
/// while the engine is otherwise idle wakes it promptly.
const IDLE_HORIZON: ChronoDuration = ChronoDuration::weeks(520); // ~10 years

/// Control surface for a set of scheduled jobs, and the activation loop
/// that fires them.
///
/// Before [`Engine::start`], `schedule`/`del_job`/`entries` mutate the entry
/// list directly (the calling task has exclusive access). After `start`,
/// the same calls are funneled through `mpsc` channels to the loop task,
/// which is the sole owner of the entry list while running — mirroring
/// `SPEC_FULL.md` §5's "these two regimes are disjoint in time" and the
/// teacher's single-task-owns-the-socket pattern in
/// `crates/eisenbahn/src/reqrep.rs`'s `ZmqRequestClient::event_loop`.
pub struct Engine {
    entries: Mutex<Vec<Entry>>,
    running: AtomicBool,
    started: AtomicBool,
    id_counter: AtomicU64,
    add_tx: mpsc::Sender<Entry>,
    add_rx: Mutex<Option<mpsc::Receiver<Entry>>>,
    del_tx: mpsc::Sender<u64>,
    del_rx: Mutex<Option<mpsc::Receiver<u64>>>,
    snapshot_tx: mpsc::Sender<oneshot::Sender<Vec<EntrySnapshot>>>,
    snapshot_rx: Mutex<Option<mpsc::Receiver<oneshot::Sender<Vec<EntrySnapshot>>>>>,
    stop: Arc<Notify>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Construct an engine with an empty entry list. No worker is running
    /// yet; call [`Engine::start`] to spawn the activation loop.
    pub fn new() -> Self {
        let (add_tx, add_rx) = mpsc::channel(1);
        let (del_tx, del_rx) = mpsc::channel(1);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(1);
        Self {
            entries: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            id_counter: AtomicU64::new(seed_id_counter()),
            add_tx,
            add_rx: Mutex::new(Some(add_rx)),
            del_tx,
            del_rx: Mutex::new(Some(del_rx)),
            snapshot_tx,
            snapshot_rx: Mutex::new(Some(snapshot_rx)),
            stop: Arc::new(Notify::new()),
            loop_handle: Mutex::new(None),
        }
    }

    /// Register an entry directly. Allocates a new id by atomically
    /// incrementing the counter; if the loop is running the entry is sent
    /// on the `add` channel and the loop owns its insertion, otherwise it
    /// is appended directly.
    pub async fn schedule(&self, schedule: Arc<dyn Schedule>, job: Arc<dyn Job>) -> u64 {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let entry = Entry {
            id,
            schedule,
            job,
            next: None,
            prev: None,
        };
        if self.running.load(Ordering::SeqCst) {
            if self.add_tx.send(entry).await.is_err() {
                warn!(id, "engine loop gone; entry dropped");
            }
        } else {
            self.entries.lock().unwrap().push(entry);
        }
        info!(id, "entry registered");
        id
    }

    /// Parse `spec` and register a closure job. Parse failures propagate to
    /// the caller (`SPEC_FULL.md` §9 resolves spec.md §7's open question in
    /// favor of propagation over the source's silent discard).
    pub async fn add_func<F>(&self, spec: &str, f: F) -> Result<u64, ParseError>
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let schedule = parse_into_schedule(spec)?;
        Ok(self.schedule(schedule, Arc::new(FuncJob(f))).await)
    }

    /// Parse `spec` and register an arbitrary [`Job`].
    pub async fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<u64, ParseError> {
        let schedule = parse_into_schedule(spec)?;
        Ok(self.schedule(schedule, job).await)
    }

    /// Register a job that fires once at `at`.
    pub async fn add_once_job(&self, at: DateTime<Local>, job: Arc<dyn Job>) -> u64 {
        self.schedule(Arc::new(OnceSchedule::new(at)), job).await
    }

    /// Remove the entry with the given id, if any.
    ///
    /// Guarded by `running` *before* touching a channel
    /// (`SPEC_FULL.md` §9 Open Question #4): when the loop isn't running
    /// there is nothing reading the `del` channel, so this always takes
    /// the direct-splice path in that case rather than risking a send that
    /// would never be received.
    #[instrument(skip(self))]
    pub async fn del_job(&self, id: u64) {
        if self.running.load(Ordering::SeqCst) {
            let _ = self.del_tx.send(id).await;
        } else {
            self.entries.lock().unwrap().retain(|e| e.id != id);
        }
    }

    /// A freshly-allocated, fully disjoint copy of every entry. Mutating
    /// the returned `Vec` (or its elements) never affects engine state.
    pub async fn entries(&self) -> Vec<EntrySnapshot> {
        if self.running.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            if self.snapshot_tx.send(tx).await.is_err() {
                return Vec::new();
            }
            rx.await.unwrap_or_default()
        } else {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(Entry::to_snapshot)
                .collect()
        }
    }

    /// Transition to running and spawn the activation loop. A no-op if the
    /// engine has already been started once (including after `stop`) —
    /// this reimplementation does not support restarting an engine whose
    /// channel receivers have already been handed to a finished loop task.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let entries = std::mem::take(&mut *self.entries.lock().unwrap());
        let add_rx = self
            .add_rx
            .lock()
            .unwrap()
            .take()
            .expect("start() called exactly once, guarded by `started`");
        let del_rx = self
            .del_rx
            .lock()
            .unwrap()
            .take()
            .expect("start() called exactly once, guarded by `started`");
        let snapshot_rx = self
            .snapshot_rx
            .lock()
            .unwrap()
            .take()
            .expect("start() called exactly once, guarded by `started`");
        let stop = Arc::clone(&self.stop);

        info!(entries = entries.len(), "activation loop starting");
        let handle = tokio::spawn(run_loop(entries, add_rx, del_rx, snapshot_rx, stop));
        *self.loop_handle.lock().unwrap() = Some(handle);
    }

    /// Stop the activation loop and block until it exits.
    ///
    /// Idempotent (`SPEC_FULL.md` §9 Open Question #5): calling `stop` on
    /// an engine that is not currently running — because it was never
    /// started, or was already stopped — is a no-op rather than the
    /// source's documented deadlock on an unbuffered stop channel.
    pub async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("stopping activation loop");
            self.stop.notify_one();
            if let Some(handle) = self.loop_handle.lock().unwrap().take() {
                let _ = handle.await;
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Seed the id counter from wall-clock nanoseconds, matching the source's
/// `getIncrement` seeding — unique across restarts without persistence.
fn seed_id_counter() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn parse_into_schedule(spec: &str) -> Result<Arc<dyn Schedule>, ParseError> {
    Ok(match cron::parse(spec)? {
        ParsedSchedule::Cron(c) => Arc::new(c) as Arc<dyn Schedule>,
        ParsedSchedule::ConstantDelay(c) => Arc::new(c) as Arc<dyn Schedule>,
    })
}

fn duration_until(target: DateTime<Local>, now: DateTime<Local>) -> StdDuration {
    (target - now).to_std().unwrap_or(StdDuration::ZERO)
}

/// The activation loop: owns `entries` exclusively for as long as it runs.
/// See `SPEC_FULL.md` §4.5 for the full per-pass algorithm this implements.
async fn run_loop(
    mut entries: Vec<Entry>,
    mut add_rx: mpsc::Receiver<Entry>,
    mut del_rx: mpsc::Receiver<u64>,
    mut snapshot_rx: mpsc::Receiver<oneshot::Sender<Vec<EntrySnapshot>>>,
    stop: Arc<Notify>,
) {
    loop {
        let now = Local::now();

        for entry in entries.iter_mut() {
            if entry.next.is_none() {
                entry.next = entry.schedule.next(now);
            }
        }
        entries.sort_by(cmp_by_next);

        let effective = entries
            .first()
            .and_then(|e| e.next)
            .unwrap_or_else(|| now + IDLE_HORIZON);

        let sleep = tokio::time::sleep(duration_until(effective, now));
        tokio::pin!(sleep);

        tokio::select! {
            biased;

            _ = stop.notified() => {
                info!("activation loop received stop signal");
                return;
            }

            Some(id) = del_rx.recv() => {
                entries.retain(|e| e.id != id);
                debug!(id, "entry removed");
            }

            Some(reply) = snapshot_rx.recv() => {
                let snapshot = entries.iter().map(Entry::to_snapshot).collect();
                let _ = reply.send(snapshot);
            }

            Some(mut entry) = add_rx.recv() => {
                entry.next = entry.schedule.next(Local::now());
                debug!(id = entry.id, next = ?entry.next, "entry added to running loop");
                entries.push(entry);
            }

            _ = &mut sleep => {
                fire_due(&mut entries, effective);
            }
        }
    }
}

/// Fire every leading entry (in current sort order) whose `next == effective`,
/// on its own fresh `tokio::spawn`ed task, then recompute `next` from
/// `effective` (never from wall-clock completion time, so a slow job never
/// drifts the schedule). An entry whose recomputed `next` is `None` is
/// dropped — its schedule is exhausted.
fn fire_due(entries: &mut Vec<Entry>, effective: DateTime<Local>) {
    let mut i = 0;
    while i < entries.len() {
        if entries[i].next != Some(effective) {
            break;
        }

        let id = entries[i].id;
        let job = Arc::clone(&entries[i].job);
        tokio::spawn(async move {
            job.run(id);
        });

        entries[i].prev = entries[i].next;
        entries[i].next = entries[i].schedule.next(effective);

        if entries[i].next.is_none() {
            debug!(id, "schedule exhausted; entry removed");
            entries.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ConstantDelay;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDur;

    struct CountingJob(Arc<AtomicUsize>);
    impl Job for CountingJob {
        fn run(&self, _id: u64) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn ids_are_pairwise_distinct() {
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut ids = Vec::new();
        for _ in 0..5 {
            let id = engine
                .schedule(
                    Arc::new(ConstantDelay::new(StdDur::from_secs(60)).unwrap()),
                    Arc::new(CountingJob(Arc::clone(&count))),
                )
                .await;
            ids.push(id);
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[tokio::test]
    async fn not_running_then_stop_never_fires() {
        // Scenario 2: AddFunc after the engine is created but never started,
        // wait briefly, and confirm the job never ran.
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        engine
            .add_func("* * * * * ?", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        tokio::time::sleep(StdDur::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn started_entry_fires_within_one_second() {
        // Scenario 3: a per-second cron job fires at least once within ~1s
        // of starting the engine.
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        engine
            .add_func("* * * * * ?", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        engine.start();
        tokio::time::sleep(StdDur::from_millis(1_200)).await;
        engine.stop().await;
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn deleted_entry_never_fires() {
        // Scenario 4: delete a per-5-second job before it ever fires.
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = engine
            .add_func("*/5 * * * * ?", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        engine.del_job(id).await;
        engine.start();
        tokio::time::sleep(StdDur::from_millis(1_500)).await;
        engine.stop().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(engine.entries().await.is_empty());
    }

    #[tokio::test]
    async fn once_job_fires_exactly_once() {
        // Scenario 5: a one-shot job due ~1.5s out fires exactly once.
        let engine = Engine::new();
        engine.start();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let at = Local::now() + ChronoDuration::milliseconds(800);
        engine
            .add_once_job(
                at,
                Arc::new(crate::job::FuncJob(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .await;
        tokio::time::sleep(StdDur::from_millis(2_000)).await;
        engine.stop().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Exhausted once-schedules are dropped from the visible entry set.
        assert!(engine.entries().await.is_empty());
    }

    #[tokio::test]
    async fn snapshotting_a_once_job_before_it_fires_does_not_consume_it() {
        // A snapshot's schedule is a disjoint copy (invariant 4): calling
        // `next` on it via `Entries()` bookkeeping must not pre-empt the
        // live entry's single firing.
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let at = Local::now() + ChronoDuration::milliseconds(800);
        engine
            .add_once_job(at, Arc::new(crate::job::FuncJob(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })))
            .await;
        engine.start();

        tokio::time::sleep(StdDur::from_millis(100)).await;
        let snapshot = engine.entries().await;
        assert_eq!(snapshot.len(), 1);
        // Querying the snapshot's schedule must not disturb the original.
        let _ = snapshot[0].schedule.next(Local::now());

        tokio::time::sleep(StdDur::from_millis(1_200)).await;
        engine.stop().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_is_disjoint_from_engine_state() {
        let engine = Engine::new();
        let count = Arc::new(AtomicUsize::new(0));
        engine
            .schedule(
                Arc::new(ConstantDelay::new(StdDur::from_secs(60)).unwrap()),
                Arc::new(CountingJob(Arc::clone(&count))),
            )
            .await;
        engine.start();
        tokio::time::sleep(StdDur::from_millis(100)).await;

        let mut snapshot = engine.entries().await;
        assert_eq!(snapshot.len(), 1);
        snapshot.clear();

        let second = engine.entries().await;
        assert_eq!(second.len(), 1, "mutating the snapshot must not affect the engine");
        engine.stop().await;
    }

    #[tokio::test]
    async fn stop_on_never_started_engine_is_a_no_op() {
        // Scenario 1: nothing added, start never called, stop completes
        // immediately without blocking.
        let engine = Engine::new();
        engine.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = Engine::new();
        engine.start();
        engine.stop().await;
        engine.stop().await; // must not hang or panic
    }

    #[tokio::test]
    async fn parse_failure_propagates_from_add_func() {
        let engine = Engine::new();
        let err = engine.add_func("not a cron", |_| {}).await.unwrap_err();
        assert!(matches!(err, ParseError::WrongFieldCount(_)));
    }
}
