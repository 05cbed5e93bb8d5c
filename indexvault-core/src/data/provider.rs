//! Vendor provider trait and structured error types.
//!
//! The VendorProvider trait abstracts over price vendors (Yahoo Finance as the
//! primary source, IEX Cloud as the backfill source, a synthetic generator for
//! dry runs) so stages can swap implementations and tests can script responses.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Ticker, VendorBatch, VendorFetchResult};

/// Structured error types for vendor and container operations.
///
/// Per-date decode problems are not errors at this level; they travel inside
/// [`VendorFetchResult`]. A `DataError` from a fetch means the whole request
/// failed and the caller decides whether to abort.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("API token not set: export {var}")]
    MissingToken { var: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("{vendor} batch {batch} failed: {source}")]
    BatchFailed {
        vendor: String,
        batch: usize,
        source: Box<DataError>,
    },

    #[error("batch size must be between 1 and {max}, got {size}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error("{vendor} has no data for {ticker}")]
    NotOffered { vendor: String, ticker: Ticker },

    #[error("no stored data for ticker '{ticker}'")]
    NotStored { ticker: Ticker },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for price vendors.
///
/// Implementations handle the specifics of one vendor. Storage sits above this
/// trait; providers never touch the filesystem.
pub trait VendorProvider: Send + Sync {
    /// Short vendor name, used in logs and attendance file names.
    fn name(&self) -> &str;

    /// Fetch adjusted daily bars for one ticker over `[start, end]`.
    fn fetch_ticker(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorFetchResult, DataError>;

    /// Fetch many tickers. Every requested ticker appears in the returned batch.
    ///
    /// The default issues one request per ticker and stops at the first
    /// fetch-level failure.
    fn fetch_batch(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorBatch, DataError> {
        let mut batch = VendorBatch::new();
        for ticker in tickers {
            let result = self.fetch_ticker(ticker, start, end)?;
            batch.insert(ticker.clone(), result);
        }
        Ok(batch)
    }

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Split `tickers` into consecutive chunks of at most `size`.
pub fn partition(tickers: &[Ticker], size: usize) -> Result<Vec<&[Ticker]>, DataError> {
    if size == 0 {
        return Err(DataError::InvalidBatchSize {
            size,
            max: usize::MAX,
        });
    }
    Ok(tickers.chunks(size).collect())
}

impl DataError {
    /// Errors no retry can fix: bad credentials or an unrecognised response.
    pub fn is_fatal(&self) -> bool {
        match self {
            DataError::AuthenticationRequired(_)
            | DataError::ResponseFormatChanged(_)
            | DataError::MissingToken { .. } => true,
            DataError::BatchFailed { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Progress callback for multi-ticker operations.
///
/// `result` carries the number of stored bars, or the reason nothing was stored.
pub trait DownloadProgress: Send {
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, available: usize, not_available: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {ticker}...", index + 1, total);
    }

    fn on_complete(
        &self,
        ticker: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(bars) => println!("  OK: {ticker} ({bars} bars)"),
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    fn on_batch_complete(&self, available: usize, not_available: usize, total: usize) {
        println!("\nDownload complete: {available}/{total} available, {not_available} not available");
    }
}

/// Progress reporter that emits tracing events instead of printing.
pub struct TracingProgress;

impl DownloadProgress for TracingProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        tracing::debug!(ticker, index = index + 1, total, "fetching");
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, result: &Result<usize, DataError>) {
        match result {
            Ok(bars) => info!(ticker, bars, "stored"),
            Err(e) => warn!(ticker, error = %e, "not stored"),
        }
    }

    fn on_batch_complete(&self, available: usize, not_available: usize, total: usize) {
        info!(available, not_available, total, "download finished");
    }
}
