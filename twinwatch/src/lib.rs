/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! twinwatch – mutual heartbeat supervision between two processes
//!
//! A client calls [`start_watchdog`], which spawns the `twinwatch-monitor`
//! executable.  Each process then sends the other a heartbeat signal on a
//! fixed period and counts the periods in which none arrived.  When the
//! count reaches its limit, the client spawns a replacement watchdog and the
//! watchdog replaces itself with a fresh client.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config       – WatchdogConfig from code, YAML or the environment
//! ├── error        – thiserror enums per failure layer
//! ├── signals      – SIGUSR1 heartbeat / SIGUSR2 stop plumbing
//! ├── rendezvous   – named-semaphore startup handshake
//! ├── session      – per-side state, miss counting, Heartbeat/Revive seams
//! ├── protocol     – heartbeat tasks, spawn-watchdog / exec-client revival
//! ├── supervisor   – client API: start_watchdog / WatchdogHandle::end
//! └── monitor      – watchdog process body
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod rendezvous;
pub mod session;
pub mod signals;
pub mod supervisor;

pub use config::{Channel, WatchdogConfig};
pub use error::{ConfigError, LaunchError, ShutdownError, StartError};
pub use session::Role;
pub use supervisor::{start_watchdog, WatchdogHandle};
