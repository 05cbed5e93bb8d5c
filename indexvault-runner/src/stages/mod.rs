//! Pipeline stages, one per CLI subcommand.
//!
//! Each stage reads the [`PipelineConfig`], does its work through the core
//! crate, persists the artifacts later stages depend on, and returns an
//! outcome value for the caller to print or export. Vendor clients are passed
//! in so stages can run against mocks.

pub mod backfill;
pub mod check;
pub mod constituents;
pub mod download;
pub mod gaps;

pub use backfill::{run_backfill, BackfillInput, BackfillOutcome};
pub use check::{run_check, CheckOutcome, CheckTarget};
pub use constituents::{run_constituents, ConstituentsOutcome};
pub use download::{run_download, DownloadOutcome};
pub use gaps::{run_gaps, GapsOutcome};

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use indexvault_core::data::{
    CircuitBreaker, DataError, IexProvider, SyntheticProvider, VendorProvider, YahooProvider,
};
use indexvault_core::domain::Ticker;
use indexvault_core::membership::{load_membership_csv, MembershipError, MembershipHistory};
use indexvault_core::reconcile::{OrdinanceViolation, ReconcileError};

use crate::config::{ConfigError, PipelineConfig, VendorKind};

/// Errors from running a pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("membership: {0}")]
    Membership(#[from] MembershipError),

    #[error("data: {0}")]
    Data(#[from] DataError),

    #[error("reconcile: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Ordinance(#[from] OrdinanceViolation),

    #[error("no membership records between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("{} not found; run `{stage}` first", path.display())]
    MissingArtifact { path: PathBuf, stage: &'static str },
}

/// Build a vendor client from the config.
pub fn build_provider(
    kind: VendorKind,
    config: &PipelineConfig,
) -> Result<Box<dyn VendorProvider>, StageError> {
    let vendors = &config.vendors;
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let provider: Box<dyn VendorProvider> = match kind {
        VendorKind::Yahoo => Box::new(
            YahooProvider::new(breaker)?
                .with_retries(vendors.max_retries, vendors.retry_base_delay()),
        ),
        VendorKind::Iex => Box::new(
            IexProvider::from_env(breaker, &vendors.iex_token_env)?
                .with_batch_size(vendors.iex_batch_size)?
                .with_range(vendors.iex_range.clone())
                .with_retries(vendors.max_retries, vendors.retry_base_delay()),
        ),
        VendorKind::Synthetic => Box::new(SyntheticProvider::new()),
    };
    info!(vendor = provider.name(), "vendor client ready");
    Ok(provider)
}

/// Membership history restricted to the configured range. Empty is an error.
pub(crate) fn load_history(config: &PipelineConfig) -> Result<MembershipHistory, StageError> {
    let start = config.range.start;
    let end = config.range.end_date();
    let history = load_membership_csv(&config.paths.membership_csv)?.slice(start, end);
    if history.is_empty() {
        return Err(StageError::EmptyRange { start, end });
    }
    Ok(history)
}

/// Constituents plus the reference ticker, sorted and unique.
pub(crate) fn universe_with_reference(history: &MembershipHistory, reference: &str) -> Vec<Ticker> {
    let mut tickers = history.all_constituents();
    if !reference.is_empty() {
        if let Err(pos) = tickers.binary_search_by(|t| t.as_str().cmp(reference)) {
            tickers.insert(pos, reference.to_string());
        }
    }
    tickers
}
