//! IndexVault Runner: pipeline stages, configuration, logging and reports.
//!
//! This crate sits between the core library and the CLI:
//! - `config`: TOML pipeline configuration with defaults and validation
//! - `logging`: tracing-subscriber setup (pretty, compact, json)
//! - `stages`: constituents, download, gaps, backfill and check
//! - `report`: JSON and CSV artifacts written next to the stage outputs

pub mod config;
pub mod logging;
pub mod report;
pub mod stages;

pub use config::{
    CalendarSource, ConfigError, GapsConfig, LoggingConfig, PathsConfig, PipelineConfig,
    RangeConfig, StorageConfig, VendorKind, VendorsConfig,
};
pub use logging::{init_logging, LogConfig, LogFormat, TimestampFormat};
pub use stages::{
    build_provider, run_backfill, run_check, run_constituents, run_download, run_gaps,
    BackfillInput, BackfillOutcome, CheckOutcome, CheckTarget, ConstituentsOutcome,
    DownloadOutcome, GapsOutcome, StageError,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<LogConfig>();
        assert_sync::<LogConfig>();
    }

    #[test]
    fn outcomes_are_send() {
        assert_send::<GapsOutcome>();
        assert_send::<BackfillOutcome>();
        assert_send::<DownloadOutcome>();
        assert_send::<StageError>();
        assert_sync::<StageError>();
    }
}
