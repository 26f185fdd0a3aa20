/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! twinwatch-sched – cooperative time-ordered task scheduler
//!
//! Module layout, leaves first:
//!
//! ```text
//! lib.rs
//! ├── heap             – comparator-ordered binary min-heap
//! ├── priority_queue   – priority vocabulary over the heap
//! ├── task             – schedulable unit with owned argument + cleanup
//! └── scheduler/       – run loop, stop flag, clocks, errors
//! ```

pub mod heap;
pub mod priority_queue;
pub mod scheduler;
pub mod task;

pub use scheduler::{Clock, RunExit, Scheduler, SchedulerError, SpinClock, StopHandle, SystemClock};
pub use task::{Task, TaskId, TaskStatus};
