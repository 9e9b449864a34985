//! Deferred work for token expiry
//!
//! The authenticator never sleeps itself. It hands expiry work to a
//! [`Scheduler`], so hosts can run it on their own executor and tests can
//! drive time by hand with [`ManualScheduler`]. Token deadlines are read from
//! the same scheduler clock, so expiry and verification never disagree.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::trace;

/// A unit of deferred work.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks now or after a delay.
pub trait Scheduler: Send + Sync {
    /// Time elapsed on this scheduler's clock since it was created.
    fn now(&self) -> Duration;

    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, task: ScheduledTask, delay: Duration);

    /// Run `task` as soon as possible, off the caller's stack.
    fn execute_now(&self, task: ScheduledTask);
}

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    epoch: Instant,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            epoch: Instant::now(),
        }
    }

    /// Scheduler on the runtime the caller is running in, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.epoch)
    }

    fn schedule(&self, task: ScheduledTask, delay: Duration) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }

    fn execute_now(&self, task: ScheduledTask) {
        self.handle.spawn(async move { task() });
    }
}

struct Queued {
    due: Duration,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_seq: u64,
    queue: Vec<Queued>,
}

/// Scheduler with a virtual clock that only moves when told to.
///
/// Tasks run on the thread that calls [`advance`](Self::advance) or
/// [`run_pending`](Self::run_pending), in due-time order, ties in submission
/// order.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Move the clock forward and run every task that became due.
    ///
    /// Returns the number of tasks run. Tasks scheduled by a running task are
    /// run too if they fall due within the same window.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.lock().now + by;

        let mut ran = 0;
        while let Some(task) = self.take_due(target) {
            task();
            ran += 1;
        }
        self.clock.lock().now = target;
        trace!(ran, "Manual scheduler advanced");
        ran
    }

    /// Run everything already due without moving the clock.
    pub fn run_pending(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    fn take_due(&self, target: Duration) -> Option<ScheduledTask> {
        let mut clock = self.clock.lock();
        let index = clock
            .queue
            .iter()
            .enumerate()
            .filter(|(_, queued)| queued.due <= target)
            .min_by_key(|(_, queued)| (queued.due, queued.seq))
            .map(|(index, _)| index)?;
        let queued = clock.queue.swap_remove(index);
        clock.now = clock.now.max(queued.due);
        Some(queued.task)
    }

    fn enqueue(&self, task: ScheduledTask, delay: Duration) {
        let mut clock = self.clock.lock();
        let due = clock.now + delay;
        let seq = clock.next_seq;
        clock.next_seq += 1;
        clock.queue.push(Queued { due, seq, task });
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock.lock().now
    }

    fn schedule(&self, task: ScheduledTask, delay: Duration) {
        self.enqueue(task, delay);
    }

    fn execute_now(&self, task: ScheduledTask) {
        self.enqueue(task, Duration::ZERO);
    }
}
