/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `twinwatch-demo`: an otherwise idle client under supervision.
//!
//! Prints its own pid and the watchdog pid on start.  Before ending
//! supervision it prints the watchdog pid again with the revival and miss
//! counters, so a caller can kill either process in between and observe the
//! replacement.
//!
//! Example:
//!   twinwatch-demo --client-interval-ms 100 --run-for-ms 5000
//!   twinwatch-demo --config twinwatch.yaml

use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use twinwatch::{start_watchdog, WatchdogConfig};

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "twinwatch-demo",
    about = "Run an idle client under twinwatch supervision",
    long_about = None,
)]
struct Cli {
    /// YAML configuration file.  Overrides every other option except --run-for-ms.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Watchdog executable.  Defaults to twinwatch-monitor next to this binary.
    #[arg(short = 'w', long = "watchdog-path")]
    watchdog_path: Option<PathBuf>,

    /// Period of client → watchdog heartbeats, in milliseconds.
    #[arg(long = "client-interval-ms", default_value_t = 1000)]
    client_interval_ms: u64,

    /// Period of watchdog → client heartbeats, in milliseconds.
    #[arg(long = "watchdog-interval-ms", default_value_t = 1000)]
    watchdog_interval_ms: u64,

    /// Missed heartbeats the client tolerates before relaunching the watchdog.
    #[arg(long = "client-miss-limit", default_value_t = 3)]
    client_miss_limit: u32,

    /// Missed heartbeats the watchdog tolerates before relaunching the client.
    #[arg(long = "watchdog-miss-limit", default_value_t = 3)]
    watchdog_miss_limit: u32,

    /// How long to stay supervised before ending, in milliseconds.
    #[arg(short = 't', long = "run-for-ms", default_value_t = 10_000)]
    run_for_ms: u64,
}

impl Cli {
    fn watchdog_config(&self) -> Result<WatchdogConfig> {
        let client_path = std::env::current_exe().context("Cannot locate own executable")?;
        let client_args = std::env::args_os().skip(1).collect();

        if let Some(path) = &self.config {
            let mut config = WatchdogConfig::load_from_file(path)?;
            config.client_path = client_path;
            config.client_args = client_args;
            return Ok(config);
        }

        let watchdog_path = match &self.watchdog_path {
            Some(path) => path.clone(),
            None => client_path.with_file_name("twinwatch-monitor"),
        };

        Ok(WatchdogConfig {
            watchdog_path,
            client_path,
            client_args,
            client_interval: Duration::from_millis(self.client_interval_ms),
            watchdog_interval: Duration::from_millis(self.watchdog_interval_ms),
            client_miss_limit: self.client_miss_limit,
            watchdog_miss_limit: self.watchdog_miss_limit,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.watchdog_config()?;
    info!(
        watchdog = %config.watchdog_path.display(),
        client_interval = ?config.client_interval,
        watchdog_interval = ?config.watchdog_interval,
        "Starting supervision"
    );

    let handle = start_watchdog(config).context("Failed to start watchdog")?;
    println!("client pid: {}", process::id());
    println!("watchdog pid: {}", handle.peer_pid());

    thread::sleep(Duration::from_millis(cli.run_for_ms));

    println!("final watchdog pid: {}", handle.peer_pid());
    println!("revivals: {}", handle.revivals());
    println!("misses: {}", handle.misses());
    println!("stopped early: {}", u8::from(handle.is_stopping()));
    if handle.is_stopping() {
        warn!("Supervision ended before the run finished; see earlier errors");
    }
    info!(revivals = handle.revivals(), "Ending supervision");
    handle.end().context("Failed to end supervision")?;
    Ok(())
}
