/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for twinwatch.
//!
//! One enum per failure layer:
//!
//! * [`ConfigError`]: a configuration value is missing or unusable.
//! * [`LaunchError`]: a peer process could not be started or synchronised.
//! * [`StartError`]: supervision could not be brought up.
//! * [`ShutdownError`]: ending supervision went wrong, naming *which* side
//!   failed so the caller can tell whether a stale watchdog may still run.
//!
//! Missed heartbeats are not errors: they are counted by the session and
//! escalate to a relaunch, not to a `Result`.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;
use twinwatch_sched::SchedulerError;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var} is not set")]
    Missing { var: &'static str },

    #[error("environment variable {var} is not valid UTF-8")]
    NotUnicode { var: &'static str },

    #[error("{var}={value:?} is not a valid unsigned integer")]
    InvalidNumber {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// Intervals and miss limits must be at least 1.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

// ── Process launch ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LaunchError {
    /// Forking/spawning the watchdog executable failed.
    #[error("cannot spawn {}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Replacing this process image with the client executable failed.
    #[error("cannot exec {}", path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The startup rendezvous semaphores could not be used.
    #[error("rendezvous with peer failed")]
    Rendezvous {
        #[source]
        source: io::Error,
    },
}

// ── Start / end of supervision ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid watchdog configuration")]
    Config(#[from] ConfigError),

    /// Installing the stop handler or masking the heartbeat signal failed.
    #[error("signal setup failed")]
    Signals(#[from] Errno),

    #[error("could not launch the peer process")]
    Launch(#[from] LaunchError),

    #[error("could not spawn the supervising thread")]
    Thread(#[source] io::Error),

    #[error("could not schedule heartbeat tasks")]
    Schedule(#[from] SchedulerError),
}

/// Why [`WatchdogHandle::end`](crate::supervisor::WatchdogHandle::end) did
/// not fully succeed.
///
/// | Variant | Meaning for the caller |
/// |---|---|
/// | `PeerSignal` | a watchdog process may still be running |
/// | `SelfSignal` | local supervision was stopped directly; the peer was told to stop |
/// | `BothSignals` | neither side received the stop request |
/// | `ThreadJoin` | the supervising thread panicked |
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("could not send stop request to watchdog process {peer}")]
    PeerSignal {
        peer: i32,
        #[source]
        source: Errno,
    },

    #[error("could not send stop request to this process")]
    SelfSignal(#[source] Errno),

    #[error("could not send stop request to this process ({self_error}) nor to watchdog {peer} ({peer_error})")]
    BothSignals {
        peer: i32,
        self_error: Errno,
        peer_error: Errno,
    },

    #[error("supervising thread did not finish cleanly")]
    ThreadJoin,
}
