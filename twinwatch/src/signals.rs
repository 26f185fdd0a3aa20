/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Signal wire protocol between the two processes.
//!
//! | Signal | Meaning |
//! |---|---|
//! | [`HEARTBEAT`] (`SIGUSR1`) | "I am alive" |
//! | [`STOP`] (`SIGUSR2`) | "end supervision" |
//!
//! The heartbeat is never delivered to a handler: it stays blocked in the
//! supervising thread, which consumes it with a zero-timeout
//! `sigtimedwait`.  The stop request is delivered to a handler whose only
//! effect is one atomic store into the session's stop flag.
//!
//! Neither signal may be used for anything else while supervision is active.

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use nix::sys::signal::{self, kill, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

pub const HEARTBEAT: Signal = Signal::SIGUSR1;
pub const STOP: Signal = Signal::SIGUSR2;

/// Stop flag the handler writes to.  Null until a handler is installed.
static STOP_TARGET: AtomicPtr<AtomicBool> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_stop(_signum: libc::c_int) {
    let target = STOP_TARGET.load(Ordering::SeqCst);
    if !target.is_null() {
        // SAFETY: targets are leaked Arcs (see install_stop_handler) and so
        // are never freed.
        unsafe { (*target).store(true, Ordering::SeqCst) };
    }
}

/// Route [`STOP`] to `flag`.
///
/// The handler keeps one strong reference to `flag` for the rest of the
/// process lifetime; a later call redirects the handler to a new flag and
/// leaks the old reference.
pub fn install_stop_handler(flag: &Arc<AtomicBool>) -> nix::Result<()> {
    let target = Arc::into_raw(Arc::clone(flag)).cast_mut();
    STOP_TARGET.store(target, Ordering::SeqCst);

    let action = SigAction::new(
        SigHandler::Handler(on_stop),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: on_stop only performs atomic loads/stores, which are
    // async-signal-safe.
    unsafe { signal::sigaction(STOP, &action) }?;
    Ok(())
}

fn heartbeat_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(HEARTBEAT);
    set
}

/// Block [`HEARTBEAT`] in the calling thread (and in every thread it spawns
/// afterwards) so heartbeats queue up for [`poll_heartbeat`] instead of
/// terminating the process.
pub fn block_heartbeat() -> nix::Result<()> {
    heartbeat_set().thread_block()?;
    // undo a previous release_heartbeat(); blocked signals stay queued either way
    // SAFETY: restoring the default disposition installs no handler code.
    unsafe { signal::signal(HEARTBEAT, SigHandler::SigDfl) }?;
    Ok(())
}

/// Discard any pending or late [`HEARTBEAT`] and unblock it in the calling
/// thread.
///
/// The disposition is left at "ignore" so a heartbeat still in flight from a
/// stopping peer cannot terminate this process.
pub fn release_heartbeat() -> nix::Result<()> {
    // SAFETY: SIG_IGN installs no handler code.
    unsafe { signal::signal(HEARTBEAT, SigHandler::SigIgn) }?;
    heartbeat_set().thread_unblock()
}

/// Undo [`install_stop_handler`] and [`block_heartbeat`] for the calling
/// thread: both signals get their default disposition back.
///
/// Only for when supervision never started.  Any pending heartbeat is
/// discarded before the default action is restored.
pub fn restore_defaults() -> nix::Result<()> {
    release_heartbeat()?;
    // SAFETY: restoring the default disposition installs no handler code.
    unsafe { signal::signal(HEARTBEAT, SigHandler::SigDfl) }?;
    unsafe { signal::signal(STOP, SigHandler::SigDfl) }?;
    Ok(())
}

/// Consume one pending heartbeat without waiting.
///
/// Returns `false` immediately when none is pending.  Several heartbeats that
/// arrived since the last poll collapse into one.
pub fn poll_heartbeat() -> bool {
    let set = heartbeat_set();
    let timeout = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `set` and `timeout` are valid for the duration of the call; a
    // null siginfo pointer is allowed.
    let received = unsafe { libc::sigtimedwait(set.as_ref(), ptr::null_mut(), &timeout) };
    received == HEARTBEAT as libc::c_int
}

pub fn send_heartbeat(peer: Pid) -> nix::Result<()> {
    kill(peer, HEARTBEAT)
}

pub fn send_stop(target: Pid) -> nix::Result<()> {
    kill(target, STOP)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
