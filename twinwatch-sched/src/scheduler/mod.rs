/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cooperative, single-threaded task scheduler.
//!
//! [`Scheduler`] keeps its [`Task`]s in a [`PriorityQueue`] ordered by due
//! time and executes them one at a time from [`Scheduler::run`].  Tasks never
//! run concurrently with each other; the only way to end a run early is the
//! stop flag, which is checked between tasks.
//!
//! # States
//! ```text
//! idle ──run()──► running ──queue empty / stop flag──► idle
//! ```
//!
//! # Example
//! ```rust
//! use std::time::{Duration, Instant};
//! use twinwatch_sched::{RunExit, Scheduler, TaskStatus};
//!
//! let mut sched = Scheduler::new();
//! let start = Instant::now();
//! sched
//!     .add_task(
//!         |fired: &mut u32| {
//!             *fired += 1;
//!             if *fired < 3 { TaskStatus::Repeat } else { TaskStatus::Done }
//!         },
//!         start,
//!         Duration::from_millis(1),
//!         0u32,
//!         |fired| assert_eq!(fired, 3),
//!     )
//!     .unwrap();
//!
//! assert_eq!(sched.run(), RunExit::Drained);
//! assert!(sched.is_empty());
//! ```

pub mod clock;
pub mod error;

pub use clock::{Clock, SpinClock, SystemClock};
pub use error::SchedulerError;

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::priority_queue::PriorityQueue;
use crate::task::{Task, TaskId, TaskStatus};

type DueOrder = fn(&Task, &Task) -> Ordering;

/// Earlier due time first.  Ties are left to the heap.
fn by_due_time(a: &Task, b: &Task) -> Ordering {
    a.due_time().cmp(&b.due_time())
}

// ── StopHandle ────────────────────────────────────────────────────────────────

/// Cloneable handle to a scheduler's stop flag.
///
/// Usable as the operation of a stop sentinel: [`StopHandle::stop`] sets the
/// flag and always answers [`TaskStatus::Done`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) -> TaskStatus {
        self.0.store(true, AtomicOrdering::SeqCst);
        TaskStatus::Done
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, AtomicOrdering::SeqCst);
    }
}

/// Why [`Scheduler::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Every task finished; the queue is empty.
    Drained,
    /// The stop flag was set.  Tasks still queued stay owned by the scheduler.
    Stopped,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Time-ordered task runner.
///
/// Dropping the scheduler drops (and so cleans up) every task still queued.
pub struct Scheduler<C = SystemClock> {
    queue: PriorityQueue<Task, DueOrder>,
    stop: StopHandle,
    clock: C,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::default())
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            queue: PriorityQueue::new(by_due_time as DueOrder),
            stop: StopHandle::default(),
            clock,
        }
    }

    /// Current time according to this scheduler's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Queue a new task and return its identity.
    ///
    /// `operation` runs at `start_time` and then every `interval` for as long
    /// as it returns [`TaskStatus::Repeat`].  `arg` is owned by the task and
    /// handed to `cleanup` when the task is destroyed.
    ///
    /// # Errors
    /// Nothing is added on error; `arg` has already been passed to `cleanup`.
    pub fn add_task<A, O, F>(
        &mut self,
        operation: O,
        start_time: Instant,
        interval: Duration,
        arg: A,
        cleanup: F,
    ) -> Result<TaskId, SchedulerError>
    where
        A: 'static,
        O: FnMut(&mut A) -> TaskStatus + 'static,
        F: FnOnce(A) + 'static,
    {
        let task = Task::new(operation, start_time, interval, arg, cleanup)?;
        let id = task.id();

        self.queue
            .enqueue(task)
            .map_err(|rejected| SchedulerError::QueueFull(rejected.reserve_error().clone()))?;

        trace!(task = %id, ?interval, "task added");
        Ok(id)
    }

    /// Queue a stop sentinel that ends [`run`](Self::run) once it fires.
    pub fn add_stop_task(&mut self, at: Instant) -> Result<TaskId, SchedulerError> {
        let handle = self.stop_handle();
        self.add_task(
            move |_: &mut ()| handle.stop(),
            at,
            Duration::ZERO,
            (),
            |_| {},
        )
    }

    /// Destroy the queued task with identity `id`.
    ///
    /// Returns `false` if no queued task has that identity.  A task that is
    /// currently executing is not in the queue and cannot be removed.
    pub fn remove_task(&mut self, id: TaskId) -> bool {
        match self.queue.erase(&id, |id, task| task.id() == *id) {
            Some(task) => {
                trace!(task = %task.id(), "task removed");
                true
            }
            None => false,
        }
    }

    /// Execute tasks in due-time order until the queue is empty or the stop
    /// flag is set.
    ///
    /// The stop flag is cleared on entry and checked after every task, so a
    /// stop requested by a task takes effect as soon as that task returns.
    pub fn run(&mut self) -> RunExit {
        self.stop.reset();
        debug!(tasks = self.queue.len(), "scheduler run loop started");

        while !self.stop.is_stopped() {
            let Some(mut task) = self.queue.dequeue() else {
                debug!("scheduler queue drained");
                return RunExit::Drained;
            };

            self.wait_until(task.due_time());

            match task.run() {
                TaskStatus::Repeat => {
                    if task.advance_due_time().is_none() {
                        warn!(task = %task.id(), "due time overflow, discarding task");
                        continue;
                    }
                    if let Err(rejected) = self.queue.enqueue(task) {
                        error!(
                            error = %rejected,
                            "could not requeue repeating task, discarding it"
                        );
                    }
                }
                TaskStatus::Done => {
                    trace!(task = %task.id(), "task finished");
                }
            }
        }

        debug!(remaining = self.queue.len(), "scheduler stopped");
        RunExit::Stopped
    }

    /// Set the stop flag.  Always answers [`TaskStatus::Done`] so it can be
    /// returned directly from a stop task's operation.
    pub fn stop(&self) -> TaskStatus {
        self.stop.stop()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Destroy every queued task.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    fn wait_until(&self, due: Instant) {
        loop {
            let now = self.clock.now();
            if now >= due {
                return;
            }
            self.clock.pause(due - now);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
