//! Calendar diff: which expected trading dates are absent from a stored series.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use super::{MissingDates, ReconcileError};
use crate::domain::{Ticker, TickerSeries};

/// `full_range − stored`.
pub fn missing_dates(stored: &BTreeSet<NaiveDate>, full_range: &[NaiveDate]) -> BTreeSet<NaiveDate> {
    full_range
        .iter()
        .filter(|d| !stored.contains(d))
        .copied()
        .collect()
}

/// Raw gaps for every ticker in `series`, including tickers with no gaps.
pub fn missing_by_ticker(
    series: &BTreeMap<Ticker, TickerSeries>,
    full_range: &[NaiveDate],
) -> MissingDates {
    series
        .par_iter()
        .map(|(ticker, s)| (ticker.clone(), missing_dates(&s.dates(), full_range)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// The expected calendar taken from one reference ticker's stored dates, sorted.
pub fn reference_calendar(
    series: &BTreeMap<Ticker, TickerSeries>,
    reference: &str,
) -> Result<Vec<NaiveDate>, ReconcileError> {
    let s = series
        .get(reference)
        .ok_or_else(|| ReconcileError::UnknownTicker {
            ticker: reference.to_string(),
        })?;
    if s.is_empty() {
        return Err(ReconcileError::EmptyReference {
            ticker: reference.to_string(),
        });
    }
    Ok(s.dates().into_iter().collect())
}

/// The expected calendar as the union of every stored date, sorted.
pub fn union_calendar(series: &BTreeMap<Ticker, TickerSeries>) -> Vec<NaiveDate> {
    let all: BTreeSet<NaiveDate> = series.values().flat_map(|s| s.points.iter().map(|p| p.date)).collect();
    all.into_iter().collect()
}
