/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Watchdog side of the pair: the body of the `twinwatch-monitor` binary.
//!
//! The monitor is always a child of the client it supervises.  It signals
//! readiness through the rendezvous, then beats and checks on its main thread
//! until the client sends the stop request.  When the client stops answering
//! the monitor becomes the new client by exec; it never returns in that case.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use nix::unistd::getppid;
use tracing::info;
use twinwatch_sched::RunExit;

use crate::config::WatchdogConfig;
use crate::error::{LaunchError, StartError};
use crate::protocol::{self, ExecClient};
use crate::rendezvous::Rendezvous;
use crate::session::{Role, Session, SignalHeartbeat};
use crate::signals;

/// Supervise the parent process until asked to stop.
pub fn run(config: WatchdogConfig) -> Result<RunExit, StartError> {
    config.validate()?;

    let stop = Arc::new(AtomicBool::new(false));
    signals::install_stop_handler(&stop)?;
    signals::block_heartbeat()?;

    let client = getppid();
    info!(client = %client, pid = %nix::unistd::getpid(), "watchdog starting");

    Rendezvous::for_client(client)
        .and_then(Rendezvous::join_as_watchdog)
        .map_err(|source| LaunchError::Rendezvous { source })?;

    let channel = config.channel(Role::Watchdog);
    let session = Arc::new(Session::new(
        Role::Watchdog,
        client,
        channel,
        stop,
        SignalHeartbeat,
        ExecClient::new(config),
    ));

    Ok(protocol::supervise(session)?)
}
