//! What a vendor hands back for each requested ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Ticker, TickerSeries};

/// A vendor signalled that one date's bar could not be decoded
/// (for example an adjusted price field was absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFieldError {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub detail: String,
}

/// Per-ticker outcome of a vendor fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VendorFetchResult {
    /// Usable bars, possibly alongside dates the vendor failed to decode.
    Fragment {
        series: TickerSeries,
        errors: Vec<VendorFieldError>,
    },
    /// The vendor does not offer this ticker (absent key or empty payload).
    NotAvailable,
    /// Every returned date failed to decode.
    Failed(Vec<VendorFieldError>),
}

impl VendorFetchResult {
    /// Build a result from decoded bars and per-date errors, collapsing the
    /// degenerate cases into `NotAvailable` / `Failed`.
    pub fn from_parts(series: TickerSeries, errors: Vec<VendorFieldError>) -> Self {
        match (series.is_empty(), errors.is_empty()) {
            (true, true) => Self::NotAvailable,
            (true, false) => Self::Failed(errors),
            _ => Self::Fragment { series, errors },
        }
    }

    /// Dates this result actually covers. Dates that also carry an error are excluded.
    pub fn covered_dates(&self) -> BTreeSet<NaiveDate> {
        match self {
            Self::Fragment { series, errors } => {
                let errored: BTreeSet<NaiveDate> = errors.iter().map(|e| e.date).collect();
                series
                    .points
                    .iter()
                    .map(|p| p.date)
                    .filter(|d| !errored.contains(d))
                    .collect()
            }
            Self::NotAvailable | Self::Failed(_) => BTreeSet::new(),
        }
    }

    pub fn errors(&self) -> &[VendorFieldError] {
        match self {
            Self::Fragment { errors, .. } => errors,
            Self::Failed(errors) => errors,
            Self::NotAvailable => &[],
        }
    }

    pub fn series(&self) -> Option<&TickerSeries> {
        match self {
            Self::Fragment { series, .. } => Some(series),
            _ => None,
        }
    }

    pub fn into_series(self) -> Option<TickerSeries> {
        match self {
            Self::Fragment { series, .. } => Some(series),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::NotAvailable)
    }
}

/// Vendor response for a batch of tickers.
pub type VendorBatch = BTreeMap<Ticker, VendorFetchResult>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn pt(day: u32) -> PricePoint {
        PricePoint {
            date: d(day),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        }
    }

    fn err(day: u32) -> VendorFieldError {
        VendorFieldError {
            ticker: "A".into(),
            date: d(day),
            detail: "missing field fOpen".into(),
        }
    }

    #[test]
    fn from_parts_collapses_empty_cases() {
        assert_eq!(
            VendorFetchResult::from_parts(TickerSeries::empty("A"), vec![]),
            VendorFetchResult::NotAvailable
        );
        assert!(matches!(
            VendorFetchResult::from_parts(TickerSeries::empty("A"), vec![err(2)]),
            VendorFetchResult::Failed(_)
        ));
        assert!(matches!(
            VendorFetchResult::from_parts(TickerSeries::new("A", vec![pt(2)]), vec![err(3)]),
            VendorFetchResult::Fragment { .. }
        ));
    }

    #[test]
    fn errored_dates_are_not_covered() {
        let r = VendorFetchResult::Fragment {
            series: TickerSeries::new("A", vec![pt(2), pt(3)]),
            errors: vec![err(3)],
        };
        let covered = r.covered_dates();
        assert!(covered.contains(&d(2)));
        assert!(!covered.contains(&d(3)));
        assert_eq!(r.errors().len(), 1);
    }

    #[test]
    fn failed_and_not_available_cover_nothing() {
        assert!(VendorFetchResult::NotAvailable.covered_dates().is_empty());
        assert!(VendorFetchResult::Failed(vec![err(2)]).covered_dates().is_empty());
        assert!(!VendorFetchResult::NotAvailable.is_available());
    }
}
