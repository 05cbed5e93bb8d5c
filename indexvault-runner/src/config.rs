//! Pipeline configuration loaded from TOML.
//!
//! Every key has a default, so an empty file is a valid configuration. The
//! secondary-vendor token is never stored here: `[vendors] iex_token_env`
//! names the environment variable that holds it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use indexvault_core::data::ContainerFormat;
use indexvault_core::data::iex::MAX_BATCH_SIZE;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for every pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub range: RangeConfig,
    pub storage: StorageConfig,
    pub vendors: VendorsConfig,
    pub gaps: GapsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Membership snapshots, header `date,tickers`.
    pub membership_csv: PathBuf,
    /// Container directory written by `download`.
    pub data_dir: PathBuf,
    /// Container directory written by `backfill` with merged series.
    pub merged_dir: PathBuf,
    /// JSON/CSV artifacts and attendance logs.
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            membership_csv: PathBuf::from("data/membership.csv"),
            data_dir: PathBuf::from("data/primary"),
            merged_dir: PathBuf::from("data/merged"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RangeConfig {
    /// First date (inclusive), `YYYY-MM-DD`.
    pub start: NaiveDate,
    /// Last date (inclusive). Absent means today.
    pub end: Option<NaiveDate>,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2007, 1, 22).unwrap_or(NaiveDate::MIN),
            end: None,
        }
    }
}

impl RangeConfig {
    pub fn end_date(&self) -> NaiveDate {
        self.end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub format: ContainerFormat,
}

/// Which vendor client a stage talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKind {
    Yahoo,
    Iex,
    /// Offline seeded random walk.
    Synthetic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VendorsConfig {
    pub primary: VendorKind,
    pub secondary: VendorKind,
    pub iex_token_env: String,
    pub iex_batch_size: usize,
    pub iex_range: String,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for VendorsConfig {
    fn default() -> Self {
        Self {
            primary: VendorKind::Yahoo,
            secondary: VendorKind::Iex,
            iex_token_env: "IEX_TOKEN".into(),
            iex_batch_size: 50,
            iex_range: "max".into(),
            max_retries: 3,
            retry_base_ms: 1000,
        }
    }
}

impl VendorsConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

/// Source of the expected trading calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSource {
    /// Date index of `reference_ticker`.
    #[default]
    Reference,
    /// Union of every stored date.
    Union,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GapsConfig {
    pub calendar: CalendarSource,
    pub reference_ticker: String,
}

impl Default for GapsConfig {
    fn default() -> Self {
        Self {
            calendar: CalendarSource::Reference,
            reference_ticker: "SPY".into(),
        }
    }
}

/// `[logging]` table. Turned into a [`crate::logging::LogConfig`] by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub timestamps: String,
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            timestamps: "local".into(),
            include_location: false,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let end = self.range.end_date();
        if self.range.start > end {
            return Err(ConfigError::Invalid(format!(
                "range.start {} is after range.end {end}",
                self.range.start
            )));
        }
        if self.vendors.iex_batch_size == 0 || self.vendors.iex_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "vendors.iex_batch_size must be in 1..={MAX_BATCH_SIZE}, got {}",
                self.vendors.iex_batch_size
            )));
        }
        if self.vendors.iex_token_env.trim().is_empty() {
            return Err(ConfigError::Invalid("vendors.iex_token_env is empty".into()));
        }
        if self.gaps.calendar == CalendarSource::Reference
            && self.gaps.reference_ticker.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "gaps.reference_ticker is required when gaps.calendar = \"reference\"".into(),
            ));
        }
        if self.paths.data_dir == self.paths.merged_dir {
            return Err(ConfigError::Invalid(
                "paths.data_dir and paths.merged_dir must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn constituents_path(&self) -> PathBuf {
        self.paths.reports_dir.join("constituents.json")
    }

    /// Membership-filtered gaps written by `gaps`, read by `backfill`.
    pub fn missing_report_path(&self) -> PathBuf {
        self.paths.reports_dir.join("missing_dates.json")
    }

    /// Gaps left after the latest backfill attempt.
    pub fn still_missing_path(&self) -> PathBuf {
        self.paths.reports_dir.join("still_missing.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.paths.reports_dir.join("backfill_ledger.json")
    }
}
