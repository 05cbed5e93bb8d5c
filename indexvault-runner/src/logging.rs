//! Logging configuration and subscriber initialization.

use std::str::FromStr;

use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-field format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (pretty, compact, json)")),
        }
    }
}

/// Timestamp format for log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    #[default]
    Local,
    Utc,
    None,
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown timestamp format '{other}' (local, utc, none)")),
        }
    }
}

/// Resolved logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub timestamps: TimestampFormat,
    /// Filter used when `RUST_LOG` is not set
    pub default_level: String,
    pub include_location: bool,
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            timestamps: TimestampFormat::Local,
            default_level: "info".to_string(),
            include_location: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Build from the `[logging]` table. Unknown format names are an error.
    pub fn from_section(section: &LoggingConfig) -> Result<Self, String> {
        Ok(Self {
            format: section.format.parse()?,
            timestamps: section.timestamps.parse()?,
            default_level: section.level.clone(),
            include_location: section.include_location,
            ..Default::default()
        })
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // Each format/timer pair is a distinct layer type, hence the match arms.
    match (config.format, config.timestamps) {
        (LogFormat::Json, TimestampFormat::None) => {
            registry.with(base.json().without_time()).try_init()?
        }
        (LogFormat::Json, TimestampFormat::Utc) => registry
            .with(base.json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?,
        (LogFormat::Json, TimestampFormat::Local) => registry
            .with(base.json().with_timer(ChronoLocal::rfc_3339()))
            .try_init()?,
        (LogFormat::Compact, TimestampFormat::None) => {
            registry.with(base.compact().without_time()).try_init()?
        }
        (LogFormat::Compact, TimestampFormat::Utc) => registry
            .with(base.compact().with_timer(utc_timer()))
            .try_init()?,
        (LogFormat::Compact, TimestampFormat::Local) => registry
            .with(base.compact().with_timer(local_timer()))
            .try_init()?,
        (LogFormat::Pretty, TimestampFormat::None) => registry.with(base.without_time()).try_init()?,
        (LogFormat::Pretty, TimestampFormat::Utc) => {
            registry.with(base.with_timer(utc_timer())).try_init()?
        }
        (LogFormat::Pretty, TimestampFormat::Local) => {
            registry.with(base.with_timer(local_timer())).try_init()?
        }
    }
    Ok(())
}

fn local_timer() -> ChronoLocal {
    ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f %z".to_string())
}

fn utc_timer() -> ChronoUtc {
    ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string())
}
