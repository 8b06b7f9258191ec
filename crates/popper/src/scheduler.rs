//! Delayed callbacks.
//!
//! The transition controller never sleeps or polls. It hands closures to a
//! [`Scheduler`] and keeps the returned [`TimerHandle`]s so it can cancel
//! them when the direction changes.
//!
//! Two implementations are provided:
//! - [`ManualScheduler`]: a virtual clock advanced explicitly by the caller.
//!   Deterministic, used by tests and by the simulator.
//! - [`TokioScheduler`]: one `spawn_local` task per timer. Tasks are `!Send`
//!   (the popper model is single-threaded), so it must be used from inside a
//!   [`tokio::task::LocalSet`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Handle of a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A delayed callback to run once.
pub type Task = Box<dyn FnOnce()>;

/// Schedules callbacks after a delay.
///
/// Cancelling is synchronous: once `cancel` returns, the callback will not
/// run. Cancelling a handle that already fired (or was already cancelled)
/// is a no-op.
pub trait Scheduler {
    /// Run `task` once, `delay` from now. Never runs the task inline.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Cancel a pending callback.
    fn cancel(&self, handle: TimerHandle);
}

/// Convert a millisecond option value into a timer delay.
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_micros((ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

// ============================================================================
// Manual (virtual clock) scheduler
// ============================================================================

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    /// Pending tasks ordered by deadline, then by scheduling order.
    queue: BTreeMap<(Duration, u64), Task>,
    deadlines: HashMap<u64, Duration>,
}

/// A scheduler driven by an explicit virtual clock.
///
/// Nothing runs until [`advance`](Self::advance) is called. Tasks fire in
/// deadline order and may schedule or cancel other tasks while running; a
/// task scheduled with a deadline inside the advanced window fires in the
/// same call.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of callbacks still waiting.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Deadline of the earliest pending callback.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .queue
            .keys()
            .next()
            .map(|&(deadline, _)| deadline)
    }

    /// Move the clock forward, firing every callback that comes due.
    ///
    /// Returns the number of callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        self.advance_to(target)
    }

    /// Move the clock to an absolute virtual time (never backwards).
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;

        loop {
            // The borrow must end before the task runs: tasks reschedule.
            let task = {
                let mut state = self.state.borrow_mut();
                let Some(entry) = state.queue.first_entry() else {
                    break;
                };
                if entry.key().0 > target {
                    break;
                }
                let ((deadline, id), task) = entry.remove_entry();
                state.deadlines.remove(&id);
                state.now = deadline;
                trace!(timer = id, at_ms = deadline.as_millis() as u64, "timer fired");
                task
            };
            task();
            fired += 1;
        }

        let mut state = self.state.borrow_mut();
        if target > state.now {
            state.now = target;
        }
        fired
    }

    /// Fire callbacks until none are pending.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            fired += self.advance_to(deadline);
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now + delay;
        state.queue.insert((deadline, id), task);
        state.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(deadline) = state.deadlines.remove(&handle.0) {
            state.queue.remove(&(deadline, handle.0));
            trace!(timer = handle.0, "timer cancelled");
        }
    }
}

// ============================================================================
// Tokio scheduler
// ============================================================================

/// A scheduler backed by tokio timers on the current [`LocalSet`].
///
/// # Panics
///
/// [`schedule`](Scheduler::schedule) panics when called outside a
/// [`LocalSet`](tokio::task::LocalSet) context.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    tasks: Rc<RefCell<HashMap<u64, JoinHandle<()>>>>,
    next_id: Rc<Cell<u64>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let tasks = Rc::clone(&self.tasks);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            tasks.borrow_mut().remove(&id);
            trace!(timer = id, "timer fired");
            task();
        });

        // The spawned task cannot run before this insert: it is only polled
        // once the current task yields.
        self.tasks.borrow_mut().insert(id, handle);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.borrow_mut().remove(&handle.0) {
            task.abort();
            trace!(timer = handle.0, "timer cancelled");
        }
    }
}
