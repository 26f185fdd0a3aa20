/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A schedulable unit of work.
//!
//! # Ownership model
//! A [`Task`] owns its argument from construction until it is dropped.  The
//! operation borrows the argument mutably on each run; the cleanup callback
//! receives it by value exactly once, from `Drop`.  Every way a task can
//! leave a scheduler (completion, removal, bulk clear, scheduler drop) goes
//! through `Drop`, so cleanup can never be skipped or run twice.  Cleanup
//! must not assume the operation ever ran.

use std::fmt;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::scheduler::SchedulerError;

// ── TaskStatus ────────────────────────────────────────────────────────────────

/// What an operation asks of the scheduler after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Advance the due time by the task's interval and queue it again.
    Repeat,
    /// The task is finished; destroy it.
    Done,
}

// ── TaskId ────────────────────────────────────────────────────────────────────

/// Opaque, unique task identity.  Only ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn generate() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// ── Type-erased body ──────────────────────────────────────────────────────────

/// Argument, operation and cleanup bundled behind one vtable so tasks with
/// different argument types can share a queue.
trait TaskBody {
    fn run(&mut self) -> TaskStatus;
}

struct Body<A, O, C>
where
    C: FnOnce(A),
{
    arg: Option<A>,
    operation: O,
    cleanup: Option<C>,
}

impl<A, O, C> TaskBody for Body<A, O, C>
where
    O: FnMut(&mut A) -> TaskStatus,
    C: FnOnce(A),
{
    fn run(&mut self) -> TaskStatus {
        match self.arg.as_mut() {
            Some(arg) => (self.operation)(arg),
            None => TaskStatus::Done,
        }
    }
}

impl<A, O, C> Drop for Body<A, O, C>
where
    C: FnOnce(A),
{
    fn drop(&mut self) {
        if let (Some(cleanup), Some(arg)) = (self.cleanup.take(), self.arg.take()) {
            cleanup(arg);
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

pub struct Task {
    id: TaskId,
    due: Instant,
    interval: Duration,
    body: Box<dyn TaskBody>,
}

impl Task {
    /// Build a task that first becomes due at `due` and, while `operation`
    /// keeps returning [`TaskStatus::Repeat`], every `interval` after that.
    ///
    /// # Errors
    /// [`SchedulerError::TimeOverflow`] if `due + interval` is not a
    /// representable instant.  On error `arg` is released through `cleanup`
    /// before returning.
    pub fn new<A, O, C>(
        operation: O,
        due: Instant,
        interval: Duration,
        arg: A,
        cleanup: C,
    ) -> Result<Self, SchedulerError>
    where
        A: 'static,
        O: FnMut(&mut A) -> TaskStatus + 'static,
        C: FnOnce(A) + 'static,
    {
        let body = Box::new(Body {
            arg: Some(arg),
            operation,
            cleanup: Some(cleanup),
        });

        if due.checked_add(interval).is_none() {
            // dropping `body` runs the cleanup
            return Err(SchedulerError::TimeOverflow { interval });
        }

        Ok(Self {
            id: TaskId::generate(),
            due,
            interval,
            body,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn due_time(&self) -> Instant {
        self.due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Invoke the operation once.
    pub fn run(&mut self) -> TaskStatus {
        self.body.run()
    }

    /// Push the due time forward by one interval.
    ///
    /// Returns `None` (due time unchanged) if the result would overflow.
    pub fn advance_due_time(&mut self) -> Option<&mut Self> {
        self.due = self.due.checked_add(self.interval)?;
        Some(self)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("due", &self.due)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_cleanup(counter: &Rc<Cell<u32>>) -> impl FnOnce(u32) + 'static {
        let counter = Rc::clone(counter);
        move |_| counter.set(counter.get() + 1)
    }

    #[test]
    fn ids_are_unique() {
        let now = Instant::now();
        let a = Task::new(|_: &mut ()| TaskStatus::Done, now, Duration::ZERO, (), |_| {}).unwrap();
        let b = Task::new(|_: &mut ()| TaskStatus::Done, now, Duration::ZERO, (), |_| {}).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn operation_sees_and_mutates_argument() {
        let mut task = Task::new(
            |n: &mut u32| {
                *n += 1;
                if *n < 3 {
                    TaskStatus::Repeat
                } else {
                    TaskStatus::Done
                }
            },
            Instant::now(),
            Duration::from_millis(1),
            0u32,
            |_| {},
        )
        .unwrap();

        assert_eq!(task.run(), TaskStatus::Repeat);
        assert_eq!(task.run(), TaskStatus::Repeat);
        assert_eq!(task.run(), TaskStatus::Done);
    }

    #[test]
    fn cleanup_runs_once_on_drop_even_if_never_run() {
        let cleaned = Rc::new(Cell::new(0));
        let task = Task::new(
            |_: &mut u32| TaskStatus::Done,
            Instant::now(),
            Duration::ZERO,
            7u32,
            counting_cleanup(&cleaned),
        )
        .unwrap();

        assert_eq!(cleaned.get(), 0);
        drop(task);
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn cleanup_receives_final_argument() {
        let seen = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&seen);
        let mut task = Task::new(
            |n: &mut u32| {
                *n *= 10;
                TaskStatus::Done
            },
            Instant::now(),
            Duration::ZERO,
            4u32,
            move |n| sink.set(n),
        )
        .unwrap();

        task.run();
        drop(task);
        assert_eq!(seen.get(), 40);
    }

    #[test]
    fn advance_adds_interval() {
        let start = Instant::now();
        let mut task = Task::new(
            |_: &mut ()| TaskStatus::Repeat,
            start,
            Duration::from_secs(2),
            (),
            |_| {},
        )
        .unwrap();

        let due = task.advance_due_time().map(|t| t.due_time());
        assert_eq!(due, Some(start + Duration::from_secs(2)));
        task.advance_due_time();
        assert_eq!(task.due_time(), start + Duration::from_secs(4));
    }

    #[test]
    fn unrepresentable_interval_is_rejected_and_cleaned_up() {
        let cleaned = Rc::new(Cell::new(0));
        let result = Task::new(
            |_: &mut u32| TaskStatus::Repeat,
            Instant::now(),
            Duration::MAX,
            1u32,
            counting_cleanup(&cleaned),
        );

        assert!(matches!(result, Err(SchedulerError::TimeOverflow { .. })));
        assert_eq!(cleaned.get(), 1);
    }
}
