//! `download`: fetch the universe from the primary vendor into the data store.

use std::path::PathBuf;
use tracing::{info, warn};

use indexvault_core::data::{
    download_universe, open_store, record_attendance, verify_saved, DownloadProgress,
    DownloadSummary, VendorProvider,
};
use indexvault_core::domain::Ticker;

use super::{load_history, universe_with_reference, StageError};
use crate::config::PipelineConfig;

#[derive(Debug)]
pub struct DownloadOutcome {
    pub vendor: String,
    pub summary: DownloadSummary,
    pub available_log: PathBuf,
    pub not_available_log: PathBuf,
    /// Tickers reported as stored whose container file is absent.
    pub unsaved: Vec<Ticker>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.unsaved.is_empty() && self.summary.aborted.is_empty() && self.summary.errored.is_empty()
    }
}

/// Download every constituent in range plus the reference ticker.
///
/// Not-available tickers do not fail the stage; they are logged to the
/// attendance files for the backfill stage to pick up. Transiently errored
/// tickers stay out of the attendance files and make the outcome unsuccessful.
/// Fatal vendor errors fail the stage before anything is logged.
pub fn run_download(
    config: &PipelineConfig,
    provider: &dyn VendorProvider,
    progress: &dyn DownloadProgress,
) -> Result<DownloadOutcome, StageError> {
    let history = load_history(config)?;
    let tickers = universe_with_reference(&history, &config.gaps.reference_ticker);
    let store = open_store(config.storage.format, &config.paths.data_dir);

    info!(
        vendor = provider.name(),
        tickers = tickers.len(),
        format = %config.storage.format,
        dir = %config.paths.data_dir.display(),
        "download started"
    );

    let summary = download_universe(
        provider,
        store.as_ref(),
        &tickers,
        config.range.start,
        config.range.end_date(),
        progress,
    )?;

    let (available_log, not_available_log) = record_attendance(
        &config.paths.reports_dir,
        provider.name(),
        &summary.available,
        &summary.not_available,
    )?;

    let unsaved = verify_saved(store.as_ref(), &summary.available);
    if !unsaved.is_empty() {
        warn!(count = unsaved.len(), "stored tickers missing on disk");
    }
    if !summary.errored.is_empty() {
        warn!(count = summary.errored.len(), "tickers failed to fetch; rerun download");
    }
    if !summary.field_errors.is_empty() {
        warn!(count = summary.field_errors.len(), "vendor rows dropped with field errors");
    }

    Ok(DownloadOutcome {
        vendor: provider.name().to_string(),
        summary,
        available_log,
        not_available_log,
        unsaved,
    })
}
