//! Download orchestrator: fetch the universe from the primary vendor and store it.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::warn;

use super::provider::{DataError, DownloadProgress, VendorProvider};
use super::store::SeriesStore;
use crate::domain::{Ticker, VendorFetchResult, VendorFieldError};
use crate::reconcile::check_ordinance;

/// Summary of a universe download.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub total: usize,
    /// Tickers whose series was stored, in request order.
    pub available: Vec<Ticker>,
    /// Tickers the vendor returned nothing usable for, in request order.
    pub not_available: Vec<Ticker>,
    /// Tickers whose fetch failed with a transient error (network, rate
    /// limit). They are not written to attendance logs.
    pub errored: Vec<Ticker>,
    /// Per-date decode errors collected across all tickers.
    pub field_errors: Vec<VendorFieldError>,
    /// Tickers skipped because the circuit breaker tripped.
    pub aborted: Vec<Ticker>,
}

impl DownloadSummary {
    pub fn all_available(&self) -> bool {
        self.not_available.is_empty() && self.errored.is_empty() && self.aborted.is_empty()
    }
}

/// Fetch each ticker, store the available ones, and sort tickers into
/// available / not available.
///
/// The stored series is sorted by date and de-duplicated before writing. Only
/// a `NotAvailable` or fully errored vendor result marks a ticker not
/// available. A transient fetch error lists the ticker as errored and moves
/// on; a tripped breaker stops the run and lists the rest as aborted.
/// Storage errors and fatal fetch errors (see [`DataError::is_fatal`]) are
/// returned immediately.
pub fn download_universe(
    provider: &dyn VendorProvider,
    store: &dyn SeriesStore,
    tickers: &[Ticker],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn DownloadProgress,
) -> Result<DownloadSummary, DataError> {
    let total = tickers.len();
    let mut summary = DownloadSummary {
        total,
        ..Default::default()
    };

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);

        let outcome = match provider.fetch_ticker(ticker, start, end) {
            Ok(result) => store_result(store, provider.name(), ticker, result, &mut summary.field_errors),
            Err(e) => Err(e),
        };

        progress.on_complete(ticker, i, total, &outcome);

        match outcome {
            Ok(_) => summary.available.push(ticker.clone()),
            Err(e @ (DataError::Storage(_) | DataError::Parquet(_) | DataError::Io(_) | DataError::Csv(_))) => {
                return Err(e)
            }
            Err(DataError::NotOffered { .. }) => summary.not_available.push(ticker.clone()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(DataError::CircuitBreakerTripped) => {
                summary.aborted.extend(tickers[i..].iter().cloned());
                warn!(remaining = total - i, "circuit breaker tripped; download stopped");
                break;
            }
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "fetch failed; ticker left for a later run");
                summary.errored.push(ticker.clone());
            }
        }
    }

    progress.on_batch_complete(summary.available.len(), summary.not_available.len(), total);
    Ok(summary)
}

fn store_result(
    store: &dyn SeriesStore,
    vendor: &str,
    ticker: &str,
    result: VendorFetchResult,
    field_errors: &mut Vec<VendorFieldError>,
) -> Result<usize, DataError> {
    field_errors.extend(result.errors().iter().cloned());
    let Some(series) = result.into_series() else {
        return Err(DataError::NotOffered {
            vendor: vendor.to_string(),
            ticker: ticker.to_string(),
        });
    };

    // Vendors may repeat or reorder rows; stored series must pass the ordinance.
    let mut seen = BTreeSet::new();
    let mut series = series;
    series.points.sort_by_key(|p| p.date);
    series.points.retain(|p| seen.insert(p.date));
    check_ordinance(&series).map_err(|v| DataError::Other(v.to_string()))?;

    store.write(ticker, &series, vendor)?;
    Ok(series.len())
}
