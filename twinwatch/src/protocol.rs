/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Heartbeat tasks and the two ways of reviving a peer.
//!
//! [`supervise`] is the body of supervision on either side: it queues the send
//! and receive tasks of a [`Session`] on a fresh [`Scheduler`] and runs it
//! until both tasks have finished.
//!
//! Reviving depends on the side:
//!
//! * the client spawns a new watchdog process ([`SpawnWatchdog`]);
//! * the watchdog replaces *itself* with a new client image
//!   ([`ExecClient`]), so the new client is its parent and will launch a new
//!   watchdog in turn.

use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::{getppid, Pid};
use tracing::{debug, info, warn};
use twinwatch_sched::{RunExit, Scheduler, SchedulerError};

use crate::config::WatchdogConfig;
use crate::error::LaunchError;
use crate::rendezvous::Rendezvous;
use crate::session::{Heartbeat, Revive, Session};

// ── Scheduling ────────────────────────────────────────────────────────────────

/// Queue the send and receive tasks of `session` on `sched`.
///
/// Both fire for the first time one period from now.
pub fn schedule_heartbeats<H, R>(
    sched: &mut Scheduler,
    session: &Arc<Session<H, R>>,
) -> Result<(), SchedulerError>
where
    H: Heartbeat + 'static,
    R: Revive + 'static,
{
    let channel = session.channel();
    let now = sched.now();

    let first_send = now
        .checked_add(channel.send_interval)
        .ok_or(SchedulerError::TimeOverflow {
            interval: channel.send_interval,
        })?;
    let first_check = now
        .checked_add(channel.receive_interval)
        .ok_or(SchedulerError::TimeOverflow {
            interval: channel.receive_interval,
        })?;

    sched.add_task(
        |s: &mut Arc<Session<H, R>>| s.send_heartbeat(),
        first_send,
        channel.send_interval,
        Arc::clone(session),
        |_| {},
    )?;
    sched.add_task(
        |s: &mut Arc<Session<H, R>>| s.receive_heartbeat(),
        first_check,
        channel.receive_interval,
        Arc::clone(session),
        |_| {},
    )?;
    Ok(())
}

/// Run supervision for `session` on the calling thread until it stops.
pub fn supervise<H, R>(session: Arc<Session<H, R>>) -> Result<RunExit, SchedulerError>
where
    H: Heartbeat + 'static,
    R: Revive + 'static,
{
    let mut sched = Scheduler::new();
    schedule_heartbeats(&mut sched, &session)?;

    info!(
        role = %session.role(),
        peer = %session.peer(),
        channel = ?session.channel(),
        "supervision started"
    );
    let exit = sched.run();
    info!(
        role = %session.role(),
        revivals = session.revivals(),
        ?exit,
        "supervision ended"
    );
    Ok(exit)
}

// ── Client side: spawn a watchdog ─────────────────────────────────────────────

/// Start the watchdog executable with `config` passed through the
/// environment and the client's arguments on its command line.
pub fn spawn_watchdog(config: &WatchdogConfig) -> Result<Child, LaunchError> {
    let child = Command::new(&config.watchdog_path)
        .args(&config.client_args)
        .envs(config.env_pairs())
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            path: config.watchdog_path.clone(),
            source,
        })?;
    debug!(pid = child.id(), path = %config.watchdog_path.display(), "watchdog spawned");
    Ok(child)
}

fn child_pid(child: &Child) -> Pid {
    Pid::from_raw(child.id() as i32)
}

/// Client-side [`Revive`]: owns the current watchdog child process.
#[derive(Debug)]
pub struct SpawnWatchdog {
    config: WatchdogConfig,
    child: Mutex<Option<Child>>,
}

impl SpawnWatchdog {
    /// Spawn the first watchdog and complete the startup rendezvous with it.
    pub fn launch(config: WatchdogConfig) -> Result<(Self, Pid), LaunchError> {
        let child = spawn_watchdog(&config)?;
        let pid = child_pid(&child);
        let launcher = Self {
            config,
            child: Mutex::new(Some(child)),
        };
        if let Err(e) = launcher.meet() {
            launcher.reap(Duration::ZERO);
            return Err(e);
        }
        Ok((launcher, pid))
    }

    fn meet(&self) -> Result<(), LaunchError> {
        Rendezvous::for_client(Pid::this())
            .and_then(Rendezvous::join_as_client)
            .map_err(|source| LaunchError::Rendezvous { source })
    }

    /// Wait up to `grace` for the current watchdog to exit, then kill it.
    pub fn reap(&self, grace: Duration) {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(mut child) = slot.take() else {
            return;
        };

        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = child.id(), %status, "watchdog exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                Ok(None) => break,
                Err(e) => {
                    warn!(pid = child.id(), error = %e, "cannot query watchdog status");
                    break;
                }
            }
        }

        warn!(pid = child.id(), ?grace, "watchdog still running, killing it");
        retire(child);
    }
}

/// Kill `child` if it is still running and collect its exit status.
fn retire(mut child: Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "kill failed");
    }
    if let Err(e) = child.wait() {
        debug!(pid = child.id(), error = %e, "wait failed");
    }
}

impl Revive for SpawnWatchdog {
    fn revive(&self, stale: Pid) -> Result<Pid, LaunchError> {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.take() {
            debug!(pid = %stale, "retiring unresponsive watchdog");
            retire(old);
        }

        let child = spawn_watchdog(&self.config)?;
        let pid = child_pid(&child);
        *slot = Some(child);
        drop(slot);

        self.meet()?;
        info!(pid = %pid, "watchdog relaunched");
        Ok(pid)
    }
}

// ── Watchdog side: become a new client ────────────────────────────────────────

/// Watchdog-side [`Revive`]: replaces this process with a fresh client.
///
/// Only returns on failure; on success the process image is gone.
#[derive(Debug)]
pub struct ExecClient {
    config: WatchdogConfig,
}

impl ExecClient {
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config }
    }
}

impl Revive for ExecClient {
    fn revive(&self, stale: Pid) -> Result<Pid, LaunchError> {
        // only our own parent may be killed; an orphaned watchdog has been
        // re-parented and `stale` may already belong to an unrelated process
        if getppid() == stale {
            if let Err(errno) = kill(stale, Signal::SIGKILL) {
                debug!(pid = %stale, %errno, "could not kill stale client");
            }
        }

        info!(path = %self.config.client_path.display(), "replacing watchdog with a new client");
        let source = Command::new(&self.config.client_path)
            .args(&self.config.client_args)
            .envs(self.config.env_pairs())
            .exec();
        Err(LaunchError::Exec {
            path: self.config.client_path.clone(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Channel;
    use crate::session::Role;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Counts beats; a poll succeeds while `alive` is set.
    #[derive(Default)]
    struct FakeLink {
        beats: AtomicU32,
        polls: AtomicU32,
        alive: AtomicBool,
    }

    impl Heartbeat for Arc<FakeLink> {
        fn beat(&self, _peer: Pid) -> nix::Result<()> {
            self.beats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn poll(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.alive.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct NoRevive {
        calls: AtomicU32,
    }

    impl Revive for NoRevive {
        fn revive(&self, stale: Pid) -> Result<Pid, LaunchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(stale)
        }
    }

    fn session(link: &Arc<FakeLink>, limit: u32) -> Arc<Session<Arc<FakeLink>, NoRevive>> {
        Arc::new(Session::new(
            Role::Client,
            Pid::from_raw(1),
            Channel {
                send_interval: Duration::from_millis(5),
                receive_interval: Duration::from_millis(10),
                miss_limit: limit,
            },
            Arc::new(AtomicBool::new(false)),
            Arc::clone(link),
            NoRevive::default(),
        ))
    }

    #[test]
    fn heartbeat_tasks_run_until_stopped() {
        let link = Arc::new(FakeLink::default());
        link.alive.store(true, Ordering::SeqCst);
        let s = session(&link, 3);

        let mut sched = Scheduler::new();
        schedule_heartbeats(&mut sched, &s).unwrap();
        assert_eq!(sched.len(), 2);

        let stopper = Arc::clone(&s);
        let at = sched.now() + Duration::from_millis(60);
        sched
            .add_task(
                move |_: &mut ()| {
                    stopper.request_stop();
                    twinwatch_sched::TaskStatus::Done
                },
                at,
                Duration::ZERO,
                (),
                |_| {},
            )
            .unwrap();

        assert_eq!(sched.run(), RunExit::Drained);
        assert!(link.beats.load(Ordering::SeqCst) >= 5);
        assert!(link.polls.load(Ordering::SeqCst) >= 3);
        assert_eq!(s.misses(), 0);
        assert_eq!(s.reviver().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn silent_peer_is_revived_during_supervision() {
        let link = Arc::new(FakeLink::default());
        let s = session(&link, 2);

        let stopper = Arc::clone(&s);
        let watcher = thread::spawn(move || {
            while stopper.revivals() == 0 {
                thread::sleep(Duration::from_millis(5));
            }
            stopper.request_stop();
        });

        assert_eq!(supervise(Arc::clone(&s)).unwrap(), RunExit::Drained);
        watcher.join().unwrap();
        assert!(s.reviver().calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn spawn_of_missing_watchdog_reports_path() {
        let config = WatchdogConfig {
            watchdog_path: PathBuf::from("/nonexistent/twinwatch-monitor"),
            client_path: PathBuf::from("/nonexistent/client"),
            client_args: Vec::new(),
            client_interval: Duration::from_millis(100),
            watchdog_interval: Duration::from_millis(100),
            client_miss_limit: 3,
            watchdog_miss_limit: 3,
        };

        let err = spawn_watchdog(&config).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::Spawn { ref path, .. } if path == &config.watchdog_path
        ));
    }
}
