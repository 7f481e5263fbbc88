//! Engine Configuration
//!
//! Defaults suit a host with a ten-minute invocation limit. Every value can
//! be overridden from the environment (`ACTIONFLOW_*`) and, in the binary,
//! from command-line flags.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(10);
pub const DEFAULT_ITERATION_PAUSE: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_RUNTIME: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_DATA_DIR: &str = ".actionflow";

/// Tunables of the invocation handler and the local emulator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum passes per invocation
    pub max_iterations: usize,
    /// Remaining time below which no new action call starts
    pub safety_margin: Duration,
    /// Pause between passes
    pub iteration_pause: Duration,
    /// Invocation limit used when the host gives no deadline
    pub max_runtime: Duration,
    /// Back-off before re-invoking after `wait`
    pub wait_interval: Duration,
    /// Root directory of the local object store
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            iteration_pause: DEFAULT_ITERATION_PAUSE,
            max_runtime: DEFAULT_MAX_RUNTIME,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `ACTIONFLOW_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse_var(&lookup, "ACTIONFLOW_MAX_ITERATIONS") {
            config.max_iterations = n;
        }
        if let Some(ms) = parse_var(&lookup, "ACTIONFLOW_SAFETY_MARGIN_MS") {
            config.safety_margin = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "ACTIONFLOW_ITERATION_PAUSE_MS") {
            config.iteration_pause = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, "ACTIONFLOW_MAX_RUNTIME_SECS") {
            config.max_runtime = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "ACTIONFLOW_WAIT_SECS") {
            config.wait_interval = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("ACTIONFLOW_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        config
    }
}

/// Parses a variable, ignoring (with a warning) values that do not parse.
fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: '{}'", name, raw);
            None
        }
    }
}
