/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `twinwatch-monitor`: the watchdog process.
//!
//! Launched by `start_watchdog`, never by hand.  Configuration comes from the
//! `TWINWATCH_*` environment variables; the command-line arguments are the
//! client's own and are handed back to it if it has to be relaunched.

use std::process;

use tracing::{error, info};

use twinwatch::config::WatchdogConfig;
use twinwatch::monitor;

fn main() {
    // Logs go to stderr so the client's stdout stays its own.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = match WatchdogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid watchdog environment: {}", e);
            process::exit(1);
        }
    };
    config.client_args = std::env::args_os().skip(1).collect();

    match monitor::run(config) {
        Ok(exit) => info!(?exit, "watchdog exiting"),
        Err(e) => {
            error!("Watchdog failed: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}
