/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Client-facing API: start a watchdog for this process and end it again.
//!
//! ```text
//! start_watchdog(config)
//!   ├─ validate config
//!   ├─ install SIGUSR2 → stop flag
//!   ├─ block SIGUSR1 (inherited by the supervising thread)
//!   ├─ spawn watchdog + rendezvous
//!   └─ spawn "twinwatch-supervisor" thread ──► protocol::supervise
//!
//! WatchdogHandle::end()
//!   ├─ SIGUSR2 → self      (stops local supervision)
//!   ├─ SIGUSR2 → watchdog  (stops remote supervision)
//!   ├─ join supervising thread
//!   ├─ release SIGUSR1
//!   └─ reap watchdog process
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::unistd::Pid;
use tracing::{error, info, warn};

use crate::config::WatchdogConfig;
use crate::error::{ShutdownError, StartError};
use crate::protocol::{self, SpawnWatchdog};
use crate::session::{Role, Session, SignalHeartbeat};
use crate::signals;

/// Extra time the watchdog gets to notice the stop request and exit.
const EXIT_GRACE: Duration = Duration::from_millis(250);

type ClientSession = Session<SignalHeartbeat, SpawnWatchdog>;

/// Start supervising this process.
///
/// Blocks until the watchdog has completed the startup rendezvous.  Call it
/// before spawning other threads: only threads created afterwards inherit the
/// blocked heartbeat signal.
///
/// # Errors
/// Nothing keeps running on error: a watchdog that was spawned before the
/// failure is killed and reaped, and both signals get their default
/// disposition back.
pub fn start_watchdog(config: WatchdogConfig) -> Result<WatchdogHandle, StartError> {
    config.validate()?;

    let started = arm_and_launch(config);
    if started.is_err() {
        if let Err(errno) = signals::restore_defaults() {
            warn!(%errno, "could not restore signal dispositions");
        }
    }
    started
}

fn arm_and_launch(config: WatchdogConfig) -> Result<WatchdogHandle, StartError> {
    let stop = Arc::new(AtomicBool::new(false));
    signals::install_stop_handler(&stop)?;
    signals::block_heartbeat()?;

    let channel = config.channel(Role::Client);
    let (launcher, peer) = SpawnWatchdog::launch(config)?;
    info!(peer = %peer, "watchdog started");

    let session = Arc::new(Session::new(
        Role::Client,
        peer,
        channel,
        stop,
        SignalHeartbeat,
        launcher,
    ));

    let worker = Arc::clone(&session);
    let spawned = thread::Builder::new()
        .name("twinwatch-supervisor".into())
        .spawn(move || {
            if let Err(e) = protocol::supervise(worker) {
                error!(error = %e, "supervision could not start");
            }
        });

    match spawned {
        Ok(thread) => Ok(WatchdogHandle { session, thread }),
        Err(e) => {
            // reap() escalates if the request went nowhere
            let _ = stop_peer(peer, signals::send_stop);
            session.reviver().reap(grace_for(&session));
            Err(StartError::Thread(e))
        }
    }
}

fn grace_for(session: &ClientSession) -> Duration {
    let channel = session.channel();
    channel.send_interval.max(channel.receive_interval) + EXIT_GRACE
}

// ── WatchdogHandle ────────────────────────────────────────────────────────────

/// A running supervision pair, as seen from the client.
#[derive(Debug)]
pub struct WatchdogHandle {
    session: Arc<ClientSession>,
    thread: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Pid of the current watchdog process.  Changes after every revival.
    pub fn peer_pid(&self) -> Pid {
        self.session.peer()
    }

    /// Number of times the watchdog has been relaunched.
    pub fn revivals(&self) -> u32 {
        self.session.revivals()
    }

    /// Consecutive checks that found no heartbeat from the watchdog.
    pub fn misses(&self) -> u32 {
        self.session.misses()
    }

    /// Whether supervision has been asked to finish, either by [`end`](Self::end)
    /// or because a watchdog could not be relaunched.
    pub fn is_stopping(&self) -> bool {
        self.session.stop_flag().load(Ordering::SeqCst)
    }

    /// End supervision on both sides.
    ///
    /// Every step is attempted even after an earlier one failed; the returned
    /// error names the most severe failure.  Call it from the thread that
    /// called [`start_watchdog`].
    pub fn end(self) -> Result<(), ShutdownError> {
        let peer = self.session.peer();
        info!(peer = %peer, "ending supervision");

        let self_result = signals::send_stop(Pid::this());
        if let Err(errno) = self_result {
            // the handler never ran: set the flag ourselves so join() returns
            warn!(%errno, "stop signal to self failed, stopping directly");
            self.session.request_stop();
        }

        let peer_result = stop_peer(peer, signals::send_stop);

        let joined = self.thread.join();
        if joined.is_err() {
            error!("supervising thread panicked");
        }

        // a relaunch may have completed while the stop request was in flight
        let (peer, peer_result) =
            restop_current_peer(peer, peer_result, self.session.peer(), signals::send_stop);

        if let Err(errno) = signals::release_heartbeat() {
            warn!(%errno, "could not release heartbeat signal");
        }
        self.session.reviver().reap(grace_for(&self.session));

        match (self_result, peer_result) {
            (Err(self_error), Err(peer_error)) => Err(ShutdownError::BothSignals {
                peer: peer.as_raw(),
                self_error,
                peer_error,
            }),
            (Err(errno), Ok(())) => Err(ShutdownError::SelfSignal(errno)),
            (Ok(()), Err(source)) => Err(ShutdownError::PeerSignal {
                peer: peer.as_raw(),
                source,
            }),
            (Ok(()), Ok(())) if joined.is_err() => Err(ShutdownError::ThreadJoin),
            (Ok(()), Ok(())) => {
                info!("supervision ended");
                Ok(())
            }
        }
    }
}

/// Make sure the stop request reached the watchdog that is current once the
/// supervising thread has finished.
///
/// Returns the pid that was last signalled and the result for it.
fn restop_current_peer<S>(
    signalled: Pid,
    result: nix::Result<()>,
    current: Pid,
    send_stop: S,
) -> (Pid, nix::Result<()>)
where
    S: FnOnce(Pid) -> nix::Result<()>,
{
    if current == signalled {
        return (signalled, result);
    }

    info!(stale = %signalled, peer = %current, "watchdog replaced while ending, stopping the new one");
    (current, stop_peer(current, send_stop))
}

/// Ask `peer` to end supervision, logging a failed request.
fn stop_peer<S>(peer: Pid, send_stop: S) -> nix::Result<()>
where
    S: FnOnce(Pid) -> nix::Result<()>,
{
    let result = send_stop(peer);
    if let Err(errno) = result {
        warn!(peer = %peer, %errno, "stop signal to watchdog failed");
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
