//! Media surface configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for a browser-like runtime.

use common::config::{ObservabilityConfig, DEFAULT_LOG_LEVEL};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default mailbox size for a participant controller.
pub const DEFAULT_PARTICIPANT_MAILBOX_SIZE: usize = 64;

/// Default mailbox size for the call-level supervisor.
pub const DEFAULT_CALL_MAILBOX_SIZE: usize = 256;

/// Default upper bound for a single playback-start request, in milliseconds.
pub const DEFAULT_PLAYBACK_TIMEOUT_MS: u64 = 10_000;

/// Media surface configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Mailbox buffer for each participant controller.
    pub participant_mailbox_size: usize,

    /// Mailbox buffer for the call supervisor.
    pub call_mailbox_size: usize,

    /// Bound on a playback-start request. `None` waits indefinitely.
    pub playback_timeout: Option<Duration>,

    /// Whether the local participant's video surface is muted along with
    /// its audio surface.
    pub mute_local_video: bool,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participant_mailbox_size: DEFAULT_PARTICIPANT_MAILBOX_SIZE,
            call_mailbox_size: DEFAULT_CALL_MAILBOX_SIZE,
            playback_timeout: Some(Duration::from_millis(DEFAULT_PLAYBACK_TIMEOUT_MS)),
            mute_local_video: true,
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let participant_mailbox_size: usize =
            parse_var(vars, "MS_PARTICIPANT_MAILBOX_SIZE")?.unwrap_or(DEFAULT_PARTICIPANT_MAILBOX_SIZE);
        let call_mailbox_size: usize =
            parse_var(vars, "MS_CALL_MAILBOX_SIZE")?.unwrap_or(DEFAULT_CALL_MAILBOX_SIZE);

        // tokio::sync::mpsc::channel panics on a zero-capacity buffer
        if participant_mailbox_size == 0 {
            return Err(ConfigError::InvalidValue(
                "MS_PARTICIPANT_MAILBOX_SIZE must be greater than 0".to_string(),
            ));
        }
        if call_mailbox_size == 0 {
            return Err(ConfigError::InvalidValue(
                "MS_CALL_MAILBOX_SIZE must be greater than 0".to_string(),
            ));
        }

        // 0 disables the timeout
        let playback_timeout_ms: u64 =
            parse_var(vars, "MS_PLAYBACK_TIMEOUT_MS")?.unwrap_or(DEFAULT_PLAYBACK_TIMEOUT_MS);
        let playback_timeout =
            (playback_timeout_ms > 0).then(|| Duration::from_millis(playback_timeout_ms));

        let mute_local_video = parse_var(vars, "MS_MUTE_LOCAL_VIDEO")?.unwrap_or(true);

        let log_level = vars
            .get("MS_LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let json_logs = parse_var(vars, "MS_JSON_LOGS")?.unwrap_or(false);

        Ok(Config {
            participant_mailbox_size,
            call_mailbox_size,
            playback_timeout,
            mute_local_video,
            observability: ObservabilityConfig {
                log_level,
                json_logs,
            },
        })
    }
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    vars.get(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}")))
        })
        .transpose()
}
