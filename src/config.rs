//! Configuration system using Figment.
//!
//! Strongly-typed configuration layered from:
//! 1. a TOML file (`config/oe10.toml` by default)
//! 2. environment variables prefixed with `OE10_`
//!
//! Every field has a capture-derived default, so a missing file yields a
//! working configuration for the standard device setup. Durations are
//! written human-style (`"1s"`, `"100ms"`) via humantime-serde.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CommanderError, Result};
use crate::protocol::timing::{INTER_BYTE_DELAY, PRE_DELAY};
use crate::protocol::TimingModel;
use crate::session::SessionConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Serial transport settings, passed through unmodified by the core.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Byte pacing and response-window timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Polling cadence and retry policy.
    #[serde(default)]
    pub session: SessionSettings,
}

/// Serial port settings. The device is fixed at 8N1, no flow control;
/// only port path and baud rate are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub port: String,
    pub baud: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
        }
    }
}

/// Transmission pacing and response-window timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before the first byte of a frame.
    #[serde(with = "humantime_serde")]
    pub pre_delay: Duration,
    /// Delay before each subsequent byte.
    #[serde(with = "humantime_serde")]
    pub inter_byte_delay: Duration,
    /// Idle gap after transmission before listening begins.
    #[serde(with = "humantime_serde")]
    pub response_settle: Duration,
    /// Response listen window.
    #[serde(with = "humantime_serde")]
    pub response_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pre_delay: PRE_DELAY,
            inter_byte_delay: INTER_BYTE_DELAY,
            response_settle: Duration::from_millis(15),
            response_timeout: Duration::from_millis(100),
        }
    }
}

/// Polling cadence and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Interval between status polls.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Consecutive failed exchanges tolerated before faulting.
    pub retry_threshold: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry_threshold: 3,
        }
    }
}

impl Config {
    /// Load from the default file location plus `OE10_` env overrides.
    ///
    /// Example override: `OE10_TRANSPORT_PORT=/dev/ttyS1`
    pub fn load() -> Result<Self> {
        Self::load_from("config/oe10.toml")
    }

    /// Load from a specific TOML file plus env overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("OE10_").split("_"))
            .extract()
            .map_err(|e| CommanderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what parsing enforces.
    pub fn validate(&self) -> Result<()> {
        if self.transport.port.is_empty() {
            return Err(CommanderError::Config(
                "transport.port must not be empty".into(),
            ));
        }
        if self.transport.baud == 0 {
            return Err(CommanderError::Config(
                "transport.baud must be positive".into(),
            ));
        }
        if self.session.retry_threshold == 0 {
            return Err(CommanderError::Config(
                "session.retry_threshold must be at least 1".into(),
            ));
        }
        let window = self.timing.response_settle + self.timing.response_timeout;
        if self.session.poll_interval <= window {
            return Err(CommanderError::Config(format!(
                "session.poll_interval ({:?}) must exceed the response window ({:?})",
                self.session.poll_interval, window
            )));
        }
        Ok(())
    }

    /// Timing model derived from the timing section.
    pub fn timing_model(&self) -> TimingModel {
        TimingModel::with_delays(self.timing.pre_delay, self.timing.inter_byte_delay)
    }

    /// Session policy derived from the timing and session sections.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: self.session.poll_interval,
            response_settle: self.timing.response_settle,
            response_timeout: self.timing.response_timeout,
            retry_threshold: self.session.retry_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_capture_derived() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.transport.baud, 9600);
        assert_eq!(config.timing.pre_delay, Duration::from_micros(1700));
        assert_eq!(config.timing.inter_byte_delay, Duration::from_millis(1));
        assert_eq!(config.session.poll_interval, Duration::from_secs(1));
        assert_eq!(config.session.retry_threshold, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.transport.port, "/dev/ttyUSB0");
    }

    #[test]
    fn toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[transport]\nport = \"/dev/ttyS3\"\n\n[session]\npoll_interval = \"2s\"\nretry_threshold = 5\n"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.transport.port, "/dev/ttyS3");
        assert_eq!(config.session.poll_interval, Duration::from_secs(2));
        assert_eq!(config.session.retry_threshold, 5);
        // Untouched sections keep defaults.
        assert_eq!(config.transport.baud, 9600);
    }

    #[test]
    fn zero_retry_threshold_is_rejected() {
        let mut config = Config::default();
        config.session.retry_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn poll_interval_must_exceed_response_window() {
        let mut config = Config::default();
        config.session.poll_interval = Duration::from_millis(50);
        assert!(config.validate().is_err());
    }
}
