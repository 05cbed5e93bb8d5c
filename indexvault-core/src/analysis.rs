//! Descriptive statistics over the stored universe and its gaps.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::data::DataError;
use crate::domain::{Ticker, TickerSeries};
use crate::reconcile::{MissingDates, ReconcileError};

/// History length → number of tickers with that many stored bars.
pub fn history_length_histogram(series: &BTreeMap<Ticker, TickerSeries>) -> BTreeMap<usize, usize> {
    let mut hist = BTreeMap::new();
    for s in series.values() {
        *hist.entry(s.len()).or_insert(0) += 1;
    }
    hist
}

/// Tickers with exactly `len` stored bars, sorted.
pub fn tickers_with_length(series: &BTreeMap<Ticker, TickerSeries>, len: usize) -> Vec<Ticker> {
    series
        .iter()
        .filter(|(_, s)| s.len() == len)
        .map(|(t, _)| t.clone())
        .collect()
}

/// Tickers among `tickers` whose date index (in stored order) differs from
/// the reference ticker's. Tickers not loaded count as differing.
pub fn check_date_uniformity(
    series: &BTreeMap<Ticker, TickerSeries>,
    tickers: &[Ticker],
    reference: &str,
) -> Result<Vec<Ticker>, ReconcileError> {
    let expected = series
        .get(reference)
        .ok_or_else(|| ReconcileError::UnknownTicker {
            ticker: reference.to_string(),
        })?
        .date_index();

    Ok(tickers
        .iter()
        .filter(|t| {
            series
                .get(t.as_str())
                .map_or(true, |s| s.date_index() != expected)
        })
        .cloned()
        .collect())
}

/// Calendar year → number of missing (ticker, date) pairs in that year.
pub fn missing_per_year(missing: &MissingDates) -> BTreeMap<i32, usize> {
    let mut per_year = BTreeMap::new();
    for date in missing.values().flatten() {
        *per_year.entry(date.year()).or_insert(0) += 1;
    }
    per_year
}

/// Ticker → sorted ISO dates, the persisted form of a missing-date map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingReport(pub BTreeMap<Ticker, BTreeSet<NaiveDate>>);

impl MissingReport {
    pub fn new(missing: MissingDates) -> Self {
        Self(missing)
    }

    pub fn into_inner(self) -> MissingDates {
        self.0
    }

    pub fn ticker_count(&self) -> usize {
        self.0.len()
    }

    pub fn date_count(&self) -> usize {
        crate::reconcile::total_dates(&self.0)
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
