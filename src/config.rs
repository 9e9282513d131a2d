//! Application-level configuration loading: mode durations, long-break cadence and sync timing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::timer::ModeDurations;

/// Default location on disk where the application looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FOCUS_CREW_CONFIG_PATH";

const DEFAULT_FOCUS_MINUTES: u32 = 25;
const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
const DEFAULT_SESSIONS_UNTIL_LONG_BREAK: u32 = 4;
const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest accepted mode duration: one day.
const MAX_MODE_MINUTES: u32 = 24 * 60;
/// Longest accepted sync interval or request timeout.
const MAX_PERIOD_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    durations: ModeDurations,
    sessions_until_long_break: u32,
    sync_interval: Duration,
    request_timeout: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        sessions_until_long_break = config.sessions_until_long_break,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Length of every mode.
    pub fn durations(&self) -> ModeDurations {
        self.durations
    }

    /// Focus sessions that earn a long break.
    pub fn sessions_until_long_break(&self) -> u32 {
        self.sessions_until_long_break
    }

    /// Period of the team session poll loop.
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }

    /// Upper bound for any single call to the session backend.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Override the mode durations.
    pub fn with_durations(mut self, durations: ModeDurations) -> Self {
        self.durations = durations;
        self
    }

    /// Override the long-break threshold; at least one.
    pub fn with_sessions_until_long_break(mut self, sessions: u32) -> Self {
        self.sessions_until_long_break = sessions.max(1);
        self
    }

    /// Override the poll period.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Override the backend call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            durations: ModeDurations::from_minutes(
                DEFAULT_FOCUS_MINUTES,
                DEFAULT_SHORT_BREAK_MINUTES,
                DEFAULT_LONG_BREAK_MINUTES,
            ),
            sessions_until_long_break: DEFAULT_SESSIONS_UNTIL_LONG_BREAK,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    focus_minutes: Option<u32>,
    short_break_minutes: Option<u32>,
    long_break_minutes: Option<u32>,
    sessions_until_long_break: Option<u32>,
    sync_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let durations = ModeDurations::from_minutes(
            minutes_or("focus_minutes", value.focus_minutes, DEFAULT_FOCUS_MINUTES),
            minutes_or(
                "short_break_minutes",
                value.short_break_minutes,
                DEFAULT_SHORT_BREAK_MINUTES,
            ),
            minutes_or(
                "long_break_minutes",
                value.long_break_minutes,
                DEFAULT_LONG_BREAK_MINUTES,
            ),
        );

        Self {
            durations,
            sessions_until_long_break: positive_or(
                "sessions_until_long_break",
                value.sessions_until_long_break,
                DEFAULT_SESSIONS_UNTIL_LONG_BREAK,
            ),
            sync_interval: period_or(
                "sync_interval_secs",
                value.sync_interval_secs,
                DEFAULT_SYNC_INTERVAL,
            ),
            request_timeout: period_or(
                "request_timeout_secs",
                value.request_timeout_secs,
                DEFAULT_REQUEST_TIMEOUT,
            ),
        }
    }
}

/// Zero is not a usable duration or threshold; keep the default instead.
fn positive_or(field: &'static str, value: Option<u32>, default: u32) -> u32 {
    match value {
        Some(0) => {
            warn!(field, default, "ignoring zero value in config");
            default
        }
        Some(value) => value,
        None => default,
    }
}

/// Mode length in minutes, bounded by [`MAX_MODE_MINUTES`].
fn minutes_or(field: &'static str, value: Option<u32>, default: u32) -> u32 {
    match positive_or(field, value, default) {
        minutes if minutes > MAX_MODE_MINUTES => {
            warn!(
                field,
                minutes,
                max = MAX_MODE_MINUTES,
                default,
                "ignoring out-of-range duration in config"
            );
            default
        }
        minutes => minutes,
    }
}

fn period_or(field: &'static str, value: Option<u64>, default: Duration) -> Duration {
    match value {
        Some(secs) if secs == 0 || secs > MAX_PERIOD_SECS => {
            warn!(
                field,
                secs,
                default_secs = default.as_secs(),
                "ignoring out-of-range period in config"
            );
            default
        }
        Some(secs) => Duration::from_secs(secs),
        None => default,
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
