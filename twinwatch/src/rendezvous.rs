/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Startup rendezvous over two POSIX named semaphores.
//!
//! Neither side may start heartbeating before the other has its heartbeat
//! signal blocked, or the first beat would kill it.  The handshake is:
//!
//! ```text
//! watchdog                     client
//! ────────                     ──────
//! post(ready)  ─────────────►  wait(ready)
//! wait(go)     ◄─────────────  post(go)
//! unlink both                  unlink both
//! ```
//!
//! Names are derived from the client's pid so concurrent pairs on one host
//! never share semaphores.  Both sides unlink; whichever comes second sees
//! `ENOENT`, which is ignored.

use std::ffi::CString;
use std::io;
use std::ptr::NonNull;

use nix::unistd::Pid;
use tracing::{debug, trace};

const NAME_PREFIX: &str = "/twinwatch";

// ── NamedSemaphore ────────────────────────────────────────────────────────────

/// An open handle to a named semaphore, closed on drop.
#[derive(Debug)]
pub struct NamedSemaphore {
    name: CString,
    sem: NonNull<libc::sem_t>,
}

// SAFETY: sem_t operations are thread-safe; the handle is only closed in Drop.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Open `name`, creating it with a count of zero if it does not exist.
    pub fn open(name: &str) -> io::Result<Self> {
        let name = CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mode: libc::c_uint = 0o600;
        let initial: libc::c_uint = 0;

        // SAFETY: `name` is a valid NUL-terminated string; with O_CREAT the
        // variadic mode and value arguments are required.
        let raw = unsafe { libc::sem_open(name.as_ptr(), libc::O_CREAT, mode, initial) };
        if raw == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        let sem = NonNull::new(raw).ok_or_else(io::Error::last_os_error)?;
        trace!(name = ?name, "semaphore opened");
        Ok(Self { name, sem })
    }

    pub fn post(&self) -> io::Result<()> {
        // SAFETY: `sem` came from a successful sem_open and is still open.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Block until the count is positive, then decrement it.
    pub fn wait(&self) -> io::Result<()> {
        loop {
            // SAFETY: as in post().
            if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Remove the name.  Open handles, including this one, stay usable.
    pub fn unlink(&self) -> io::Result<()> {
        // SAFETY: `name` is a valid NUL-terminated string.
        if unsafe { libc::sem_unlink(self.name.as_ptr()) } == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: closed exactly once.
        unsafe { libc::sem_close(self.sem.as_ptr()) };
    }
}

// ── Rendezvous ────────────────────────────────────────────────────────────────

/// The two semaphores of one pair's handshake.
#[derive(Debug)]
pub struct Rendezvous {
    ready: NamedSemaphore,
    go: NamedSemaphore,
}

impl Rendezvous {
    /// Semaphores for the pair whose client has pid `client`.
    pub fn for_client(client: Pid) -> io::Result<Self> {
        Self::with_stem(&format!("{NAME_PREFIX}-{client}"))
    }

    fn with_stem(stem: &str) -> io::Result<Self> {
        Ok(Self {
            ready: NamedSemaphore::open(&format!("{stem}-ready"))?,
            go: NamedSemaphore::open(&format!("{stem}-go"))?,
        })
    }

    /// Client half: wait for the watchdog's "ready", answer "go".
    pub fn join_as_client(self) -> io::Result<()> {
        self.ready.wait()?;
        self.go.post()?;
        self.finish()
    }

    /// Watchdog half: announce "ready", wait for "go".
    pub fn join_as_watchdog(self) -> io::Result<()> {
        self.ready.post()?;
        self.go.wait()?;
        self.finish()
    }

    fn finish(self) -> io::Result<()> {
        self.ready.unlink()?;
        self.go.unlink()?;
        debug!("rendezvous complete");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
