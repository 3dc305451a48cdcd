//! Configuration for the runner process.
//!
//! Connection settings come from environment variables. Agent tunables and
//! site descriptors live in the YAML file handled by
//! [`trawler_core::config`]; this module only knows where that file is.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunnerError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Runner configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// WebSocket URL of the game client (e.g. `ws://localhost:7780`).
    pub ws_url: String,
    /// WebSocket URL of the monitor, or `None` when disabled.
    pub monitor_url: Option<String>,
    /// Sleep between loop iterations.
    pub poll_interval: Duration,
    /// Path to the agent configuration file.
    pub config_path: PathBuf,
    /// Log output format.
    pub log_format: LogFormat,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `BOT_WS_URL` -- client URL (default `ws://localhost:7780`)
    /// - `MONITOR_URL` -- monitor URL (default `ws://localhost:7781`, `off` disables)
    /// - `BOT_POLL_INTERVAL_MS` -- loop sleep in milliseconds (default 600)
    /// - `TRAWLER_CONFIG` -- agent config file (default `trawler-config.yaml`)
    /// - `BOT_LOG_FORMAT` -- `json` for JSON logs, anything else for text
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ws_url = lookup("BOT_WS_URL").unwrap_or_else(|| "ws://localhost:7780".to_owned());

        let monitor_url = match lookup("MONITOR_URL") {
            Some(url) if is_disabled(&url) => None,
            Some(url) => Some(url),
            None => Some("ws://localhost:7781".to_owned()),
        };

        let poll_interval_ms: u64 = lookup("BOT_POLL_INTERVAL_MS")
            .unwrap_or_else(|| "600".to_owned())
            .trim()
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid BOT_POLL_INTERVAL_MS: {e}")))?;
        if poll_interval_ms == 0 {
            return Err(RunnerError::Config(
                "BOT_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        let config_path = lookup("TRAWLER_CONFIG")
            .map_or_else(|| PathBuf::from("trawler-config.yaml"), PathBuf::from);

        let log_format = match lookup("BOT_LOG_FORMAT") {
            Some(format) if format.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            ws_url,
            monitor_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            config_path,
            log_format,
        })
    }
}

fn is_disabled(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("off")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = RunnerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.ws_url, "ws://localhost:7780");
        assert_eq!(config.monitor_url.as_deref(), Some("ws://localhost:7781"));
        assert_eq!(config.poll_interval, Duration::from_millis(600));
        assert_eq!(config.config_path, PathBuf::from("trawler-config.yaml"));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn monitor_can_be_disabled() {
        let config = RunnerConfig::from_lookup(|key| {
            (key == "MONITOR_URL").then(|| "OFF".to_owned())
        })
        .unwrap();
        assert!(config.monitor_url.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = RunnerConfig::from_lookup(|key| match key {
            "BOT_WS_URL" => Some("ws://10.0.0.5:9000".to_owned()),
            "BOT_POLL_INTERVAL_MS" => Some("250".to_owned()),
            "TRAWLER_CONFIG" => Some("/etc/trawler.yaml".to_owned()),
            "BOT_LOG_FORMAT" => Some("JSON".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.ws_url, "ws://10.0.0.5:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.config_path, PathBuf::from("/etc/trawler.yaml"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_poll_interval_is_rejected() {
        for value in ["fast", "0", "-5"] {
            let result = RunnerConfig::from_lookup(|key| {
                (key == "BOT_POLL_INTERVAL_MS").then(|| value.to_owned())
            });
            assert!(matches!(result, Err(RunnerError::Config(_))), "{value}");
        }
    }
}
