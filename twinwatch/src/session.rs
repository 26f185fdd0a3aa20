/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! One side of a supervision pair.
//!
//! A [`Session`] owns everything the two heartbeat tasks share: who the peer
//! is, how many consecutive checks found no heartbeat, the stop flag, and the
//! two seams to the outside world:
//!
//! * [`Heartbeat`] – how beats are sent and observed (signals in production);
//! * [`Revive`]    – how an unresponsive peer is replaced.
//!
//! ```text
//!  send task ──every send_interval────► heartbeat.beat(peer)
//!  receive task ──every receive_interval─► heartbeat.poll()
//!        │ miss
//!        ▼
//!  misses += 1 ── misses ≥ limit ──► reviver.revive(peer) ──► new peer, misses = 0
//! ```
//!
//! Both task bodies answer `Done` once the stop flag is set, which ends
//! supervision after at most one more period on each side.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use nix::unistd::Pid;
use tracing::{debug, error, info, warn};
use twinwatch_sched::TaskStatus;

use crate::config::Channel;
use crate::error::LaunchError;
use crate::signals;

// ── Role ──────────────────────────────────────────────────────────────────────

/// Which half of the pair this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The supervised application.
    Client,
    /// The monitor process the client launched.
    Watchdog,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Watchdog => f.write_str("watchdog"),
        }
    }
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Transport for "I am alive".
pub trait Heartbeat {
    fn beat(&self, peer: Pid) -> nix::Result<()>;

    /// Consume a heartbeat received since the last poll, without waiting.
    fn poll(&self) -> bool;
}

/// Replaces a peer that stopped answering.
pub trait Revive {
    /// Launch a new peer in place of `stale` and return its pid.
    fn revive(&self, stale: Pid) -> Result<Pid, LaunchError>;
}

/// Production [`Heartbeat`]: `SIGUSR1` over `kill(2)`, received with a
/// zero-timeout `sigtimedwait` in the supervising thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalHeartbeat;

impl Heartbeat for SignalHeartbeat {
    fn beat(&self, peer: Pid) -> nix::Result<()> {
        signals::send_heartbeat(peer)
    }

    fn poll(&self) -> bool {
        signals::poll_heartbeat()
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Session<H, R> {
    role: Role,
    peer: AtomicI32,
    misses: AtomicU32,
    revivals: AtomicU32,
    channel: Channel,
    stop: Arc<AtomicBool>,
    heartbeat: H,
    reviver: R,
}

impl<H: Heartbeat, R: Revive> Session<H, R> {
    pub fn new(
        role: Role,
        peer: Pid,
        channel: Channel,
        stop: Arc<AtomicBool>,
        heartbeat: H,
        reviver: R,
    ) -> Self {
        Self {
            role,
            peer: AtomicI32::new(peer.as_raw()),
            misses: AtomicU32::new(0),
            revivals: AtomicU32::new(0),
            channel,
            stop,
            heartbeat,
            reviver,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The peer currently being supervised.  Changes after every revival.
    pub fn peer(&self) -> Pid {
        Pid::from_raw(self.peer.load(Ordering::SeqCst))
    }

    /// Consecutive receive checks that found no heartbeat.
    pub fn misses(&self) -> u32 {
        self.misses.load(Ordering::SeqCst)
    }

    /// How many times the peer has been relaunched.
    pub fn revivals(&self) -> u32 {
        self.revivals.load(Ordering::SeqCst)
    }

    pub fn reviver(&self) -> &R {
        &self.reviver
    }

    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stop
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    // ── Task bodies ───────────────────────────────────────────────────────────

    /// Body of the periodic send task.
    pub fn send_heartbeat(&self) -> TaskStatus {
        if self.is_stopping() {
            debug!(role = %self.role, "send task finished");
            return TaskStatus::Done;
        }

        let peer = self.peer();
        match self.heartbeat.beat(peer) {
            Ok(()) => debug!(role = %self.role, peer = %peer, "heartbeat sent"),
            // a dead peer is detected by the other side's miss counter
            Err(errno) => debug!(role = %self.role, peer = %peer, %errno, "heartbeat not delivered"),
        }
        TaskStatus::Repeat
    }

    /// Body of the periodic receive task.
    pub fn receive_heartbeat(&self) -> TaskStatus {
        if self.heartbeat.poll() {
            let previous = self.misses.swap(0, Ordering::SeqCst);
            debug!(role = %self.role, previous_misses = previous, "heartbeat received");
        } else {
            let misses = self.misses.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(
                role = %self.role,
                peer = %self.peer(),
                misses,
                limit = self.channel.miss_limit,
                "heartbeat missed"
            );
            if misses >= self.channel.miss_limit && !self.is_stopping() {
                self.revive_peer();
            }
        }

        if self.is_stopping() {
            debug!(role = %self.role, "receive task finished");
            TaskStatus::Done
        } else {
            TaskStatus::Repeat
        }
    }

    fn revive_peer(&self) {
        let stale = self.peer();
        info!(role = %self.role, peer = %stale, "peer unresponsive, relaunching");

        match self.reviver.revive(stale) {
            Ok(fresh) => {
                self.peer.store(fresh.as_raw(), Ordering::SeqCst);
                self.misses.store(0, Ordering::SeqCst);
                let revivals = self.revivals.fetch_add(1, Ordering::SeqCst) + 1;
                info!(role = %self.role, stale = %stale, peer = %fresh, revivals, "peer relaunched");
            }
            Err(e) => {
                error!(role = %self.role, error = %e, "cannot relaunch peer, ending supervision");
                self.request_stop();
            }
        }
    }
}

impl<H, R> fmt::Debug for Session<H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("peer", &self.peer.load(Ordering::SeqCst))
            .field("misses", &self.misses.load(Ordering::SeqCst))
            .field("channel", &self.channel)
            .field("stopping", &self.stop.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Replays a fixed sequence of poll results, then reports silence.
    #[derive(Default)]
    struct ScriptedHeartbeat {
        polls: RefCell<VecDeque<bool>>,
        sent: RefCell<Vec<Pid>>,
    }

    impl ScriptedHeartbeat {
        fn with_polls(polls: &[bool]) -> Self {
            Self {
                polls: RefCell::new(polls.iter().copied().collect()),
                sent: RefCell::default(),
            }
        }
    }

    impl Heartbeat for ScriptedHeartbeat {
        fn beat(&self, peer: Pid) -> nix::Result<()> {
            self.sent.borrow_mut().push(peer);
            Ok(())
        }

        fn poll(&self) -> bool {
            self.polls.borrow_mut().pop_front().unwrap_or(false)
        }
    }

    /// Hands out pids 1000, 1001, … or fails every time.
    struct CountingReviver {
        next: Cell<i32>,
        calls: Cell<u32>,
        fail: bool,
    }

    impl CountingReviver {
        fn working() -> Self {
            Self {
                next: Cell::new(1000),
                calls: Cell::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::working()
            }
        }
    }

    impl Revive for CountingReviver {
        fn revive(&self, _stale: Pid) -> Result<Pid, LaunchError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(LaunchError::Spawn {
                    path: PathBuf::from("/nonexistent"),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            let pid = self.next.get();
            self.next.set(pid + 1);
            Ok(Pid::from_raw(pid))
        }
    }

    fn channel(limit: u32) -> Channel {
        Channel {
            send_interval: Duration::from_millis(10),
            receive_interval: Duration::from_millis(10),
            miss_limit: limit,
        }
    }

    fn session(
        polls: &[bool],
        limit: u32,
        reviver: CountingReviver,
    ) -> Session<ScriptedHeartbeat, CountingReviver> {
        Session::new(
            Role::Client,
            Pid::from_raw(42),
            channel(limit),
            Arc::new(AtomicBool::new(false)),
            ScriptedHeartbeat::with_polls(polls),
            reviver,
        )
    }

    // ── Receiving ─────────────────────────────────────────────────────────────

    #[test]
    fn heartbeat_resets_miss_counter_before_limit() {
        let s = session(&[false, false, true], 3, CountingReviver::working());

        assert_eq!(s.receive_heartbeat(), TaskStatus::Repeat);
        assert_eq!(s.receive_heartbeat(), TaskStatus::Repeat);
        assert_eq!(s.misses(), 2);

        assert_eq!(s.receive_heartbeat(), TaskStatus::Repeat);
        assert_eq!(s.misses(), 0);
        assert_eq!(s.reviver().calls.get(), 0);
        assert_eq!(s.peer(), Pid::from_raw(42));
    }

    #[test]
    fn reaching_miss_limit_relaunches_peer() {
        let s = session(&[], 3, CountingReviver::working());

        for _ in 0..3 {
            assert_eq!(s.receive_heartbeat(), TaskStatus::Repeat);
        }

        assert_eq!(s.reviver().calls.get(), 1);
        assert_eq!(s.peer(), Pid::from_raw(1000));
        assert_eq!(s.misses(), 0);
        assert_eq!(s.revivals(), 1);
    }

    #[test]
    fn continued_silence_relaunches_again() {
        let s = session(&[], 2, CountingReviver::working());

        for _ in 0..4 {
            s.receive_heartbeat();
        }

        assert_eq!(s.reviver().calls.get(), 2);
        assert_eq!(s.peer(), Pid::from_raw(1001));
    }

    #[test]
    fn failed_relaunch_ends_supervision() {
        let s = session(&[], 1, CountingReviver::failing());

        assert_eq!(s.receive_heartbeat(), TaskStatus::Done);
        assert!(s.is_stopping());
        assert_eq!(s.peer(), Pid::from_raw(42));
        assert_eq!(s.revivals(), 0);
    }

    // ── Sending ───────────────────────────────────────────────────────────────

    #[test]
    fn send_targets_current_peer() {
        let s = session(&[], 1, CountingReviver::working());

        assert_eq!(s.send_heartbeat(), TaskStatus::Repeat);
        s.receive_heartbeat(); // relaunch → pid 1000
        assert_eq!(s.send_heartbeat(), TaskStatus::Repeat);

        let sent = s.heartbeat.sent.borrow();
        assert_eq!(*sent, vec![Pid::from_raw(42), Pid::from_raw(1000)]);
    }

    // ── Stop ──────────────────────────────────────────────────────────────────

    #[test]
    fn stop_flag_finishes_both_tasks() {
        let s = session(&[true], 3, CountingReviver::working());
        s.request_stop();

        assert_eq!(s.send_heartbeat(), TaskStatus::Done);
        assert_eq!(s.receive_heartbeat(), TaskStatus::Done);
        assert!(s.heartbeat.sent.borrow().is_empty());
    }

    #[test]
    fn no_relaunch_once_stopping() {
        let s = session(&[], 1, CountingReviver::working());
        s.request_stop();

        assert_eq!(s.receive_heartbeat(), TaskStatus::Done);
        assert_eq!(s.reviver().calls.get(), 0);
    }

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(Role::Client.to_string(), "client");
        assert_eq!(Role::Watchdog.to_string(), "watchdog");
    }
}
