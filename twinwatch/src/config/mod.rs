/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Watchdog configuration: where the two executables live and how often each
//! side beats and checks.
//!
//! Three sources feed the same [`WatchdogConfig`]:
//!
//! * built in code by the embedding application;
//! * a YAML file ([`WatchdogConfig::load_from_file`]);
//! * the process environment ([`WatchdogConfig::from_env`]), which is how a
//!   freshly launched watchdog learns its configuration.  [`env_pairs`]
//!   renders the same variables for the launcher.
//!
//! The expected YAML structure is:
//! ```yaml
//! watchdog_path: /usr/local/bin/twinwatch-monitor
//! client_path: /usr/local/bin/my-service
//! client_args: ["--port", "8080"]
//! client_interval_ms: 1000
//! watchdog_interval_ms: 1000
//! client_miss_limit: 3
//! watchdog_miss_limit: 5
//! ```
//!
//! [`env_pairs`]: WatchdogConfig::env_pairs

use std::ffi::OsString;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::session::Role;

// ── Environment variable names ────────────────────────────────────────────────

pub const ENV_WATCHDOG_PATH: &str = "TWINWATCH_WATCHDOG_PATH";
pub const ENV_CLIENT_PATH: &str = "TWINWATCH_CLIENT_PATH";
pub const ENV_CLIENT_INTERVAL_MS: &str = "TWINWATCH_CLIENT_INTERVAL_MS";
pub const ENV_WATCHDOG_INTERVAL_MS: &str = "TWINWATCH_WATCHDOG_INTERVAL_MS";
pub const ENV_CLIENT_MISS_LIMIT: &str = "TWINWATCH_CLIENT_MISS_LIMIT";
pub const ENV_WATCHDOG_MISS_LIMIT: &str = "TWINWATCH_WATCHDOG_MISS_LIMIT";

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    watchdog_path: PathBuf,
    client_path: PathBuf,
    #[serde(default)]
    client_args: Vec<String>,
    client_interval_ms: u64,
    watchdog_interval_ms: u64,
    client_miss_limit: u32,
    watchdog_miss_limit: u32,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Full launch configuration shared by both processes.
///
/// "Client" is the supervised application; "watchdog" is the monitor process
/// it launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Executable image of the watchdog process.
    pub watchdog_path: PathBuf,
    /// Executable image of the client, used when the watchdog revives it.
    pub client_path: PathBuf,
    /// Arguments (without `argv[0]`) passed on every launch of either side.
    pub client_args: Vec<OsString>,
    /// Period of client → watchdog heartbeats (and of the watchdog's checks).
    pub client_interval: Duration,
    /// Period of watchdog → client heartbeats (and of the client's checks).
    pub watchdog_interval: Duration,
    /// Consecutive misses the client tolerates before relaunching the watchdog.
    pub client_miss_limit: u32,
    /// Consecutive misses the watchdog tolerates before relaunching the client.
    pub watchdog_miss_limit: u32,
}

/// The intervals and limit that apply to one side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub send_interval: Duration,
    pub receive_interval: Duration,
    pub miss_limit: u32,
}

impl WatchdogConfig {
    /// Intervals and miss limit as seen from `role`.
    pub fn channel(&self, role: Role) -> Channel {
        match role {
            Role::Client => Channel {
                send_interval: self.client_interval,
                receive_interval: self.watchdog_interval,
                miss_limit: self.client_miss_limit,
            },
            Role::Watchdog => Channel {
                send_interval: self.watchdog_interval,
                receive_interval: self.client_interval,
                miss_limit: self.watchdog_miss_limit,
            },
        }
    }

    /// Reject zero intervals and zero miss limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "client_interval",
            });
        }
        if self.watchdog_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "watchdog_interval",
            });
        }
        if self.client_miss_limit == 0 {
            return Err(ConfigError::Zero {
                field: "client_miss_limit",
            });
        }
        if self.watchdog_miss_limit == 0 {
            return Err(ConfigError::Zero {
                field: "watchdog_miss_limit",
            });
        }
        Ok(())
    }

    // ── Environment ───────────────────────────────────────────────────────────

    /// Read the configuration from this process's environment.
    ///
    /// `client_args` is left empty; the watchdog receives those as its own
    /// command-line arguments.
    ///
    /// # Errors
    /// Every variable is required.  A missing, non-UTF-8, non-numeric or zero
    /// value is reported as a [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let path = |var: &'static str| -> Result<PathBuf, ConfigError> {
            lookup(var)
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing { var })
        };

        let config = Self {
            watchdog_path: path(ENV_WATCHDOG_PATH)?,
            client_path: path(ENV_CLIENT_PATH)?,
            client_args: Vec::new(),
            client_interval: Duration::from_millis(parse_var(&lookup, ENV_CLIENT_INTERVAL_MS)?),
            watchdog_interval: Duration::from_millis(parse_var(&lookup, ENV_WATCHDOG_INTERVAL_MS)?),
            client_miss_limit: parse_var(&lookup, ENV_CLIENT_MISS_LIMIT)?,
            watchdog_miss_limit: parse_var(&lookup, ENV_WATCHDOG_MISS_LIMIT)?,
        };
        config.validate()?;

        debug!(?config, "configuration read from environment");
        Ok(config)
    }

    /// The environment a launched peer needs to rebuild this configuration.
    pub fn env_pairs(&self) -> Vec<(&'static str, OsString)> {
        vec![
            (ENV_WATCHDOG_PATH, self.watchdog_path.clone().into_os_string()),
            (ENV_CLIENT_PATH, self.client_path.clone().into_os_string()),
            (
                ENV_CLIENT_INTERVAL_MS,
                self.client_interval.as_millis().to_string().into(),
            ),
            (
                ENV_WATCHDOG_INTERVAL_MS,
                self.watchdog_interval.as_millis().to_string().into(),
            ),
            (
                ENV_CLIENT_MISS_LIMIT,
                self.client_miss_limit.to_string().into(),
            ),
            (
                ENV_WATCHDOG_MISS_LIMIT,
                self.watchdog_miss_limit.to_string().into(),
            ),
        ]
    }

    // ── YAML ──────────────────────────────────────────────────────────────────

    /// Parse a YAML configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is invalid or
    /// incomplete, or a value fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading watchdog configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let config = Self {
            watchdog_path: file.watchdog_path,
            client_path: file.client_path,
            client_args: file.client_args.into_iter().map(OsString::from).collect(),
            client_interval: Duration::from_millis(file.client_interval_ms),
            watchdog_interval: Duration::from_millis(file.watchdog_interval_ms),
            client_miss_limit: file.client_miss_limit,
            watchdog_miss_limit: file.watchdog_miss_limit,
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        info!(
            watchdog = %config.watchdog_path.display(),
            client = %config.client_path.display(),
            client_interval = ?config.client_interval,
            watchdog_interval = ?config.watchdog_interval,
            "Watchdog configuration loaded"
        );
        Ok(config)
    }
}

/// Look up `var` and parse it as an unsigned integer.
fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr<Err = ParseIntError>,
    F: Fn(&str) -> Option<OsString>,
{
    let raw = lookup(var).ok_or(ConfigError::Missing { var })?;
    let text = raw.to_str().ok_or(ConfigError::NotUnicode { var })?;
    text.trim()
        .parse::<T>()
        .map_err(|source| ConfigError::InvalidNumber {
            var,
            value: text.to_string(),
            source,
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
