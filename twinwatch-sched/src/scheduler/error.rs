/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Failures when building or queueing a task.
//!
//! Absence is not an error here: removing an unknown task or running an empty
//! scheduler report through `bool` / [`RunExit`](super::RunExit) instead.

use std::collections::TryReserveError;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Advancing the due time by `interval` would leave the representable
    /// range of [`Instant`](std::time::Instant).
    #[error("interval {interval:?} cannot be added to the task's start time")]
    TimeOverflow { interval: Duration },

    /// The task queue could not grow; the task was discarded (its cleanup
    /// ran) and nothing was added.
    #[error("task queue is out of capacity")]
    QueueFull(#[source] TryReserveError),
}
