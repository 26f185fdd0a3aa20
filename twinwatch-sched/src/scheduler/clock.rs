/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time sources for the run loop.
//!
//! The run loop polls [`Clock::now`] until it reaches a task's due time and
//! calls [`Clock::pause`] between polls.  A task therefore never fires before
//! its due time; how late it fires depends on how long `pause` gives away.

use std::time::{Duration, Instant};

/// Longest nap [`SystemClock`] takes between polls.
pub const DEFAULT_MAX_NAP: Duration = Duration::from_millis(5);

pub trait Clock {
    fn now(&self) -> Instant;

    /// Called while waiting, with the time still left until the due time.
    ///
    /// The default spins.
    fn pause(&self, remaining: Duration) {
        let _ = remaining;
        std::hint::spin_loop();
    }
}

/// Monotonic clock that naps for at most `max_nap` between polls instead of
/// burning a core.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    max_nap: Duration,
}

impl SystemClock {
    pub fn with_max_nap(max_nap: Duration) -> Self {
        Self { max_nap }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_max_nap(DEFAULT_MAX_NAP)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn pause(&self, remaining: Duration) {
        std::thread::sleep(remaining.min(self.max_nap));
    }
}

/// Pure busy-wait clock: polls without ever yielding the thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinClock;

impl Clock for SpinClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
