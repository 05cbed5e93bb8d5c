//! Backfill reconciliation: how much of the true-gap report a vendor filled.
//!
//! [`reconcile`] is a pure function of its two inputs. Calling it twice with
//! the same report and vendor batch yields identical results; the caller
//! threads the outputs (filled set, still-missing map) to later stages
//! explicitly.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{MissingDates, ReconcileError};
use crate::domain::{Ticker, VendorBatch, VendorFieldError};

/// Per-ticker counts for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerCounts {
    /// True-missing dates going into the pass.
    pub before: usize,
    /// Dates still missing after the pass.
    pub still_missing: usize,
    /// `before - still_missing`. Never negative, never above `before`.
    pub reduced: usize,
}

/// Read-only summary of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub per_ticker: BTreeMap<Ticker, TickerCounts>,
    pub total_before: usize,
    pub total_still_missing: usize,
    pub total_reduced: usize,
    /// Tickers with no remaining gaps.
    pub filled: BTreeSet<Ticker>,
    /// Tickers with at least one remaining gap.
    pub incomplete: BTreeSet<Ticker>,
    /// Incomplete tickers the vendor did not offer. Always a subset of `incomplete`.
    pub not_available: BTreeSet<Ticker>,
}

/// Full output of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Every ticker of the input report; filled tickers map to an empty set.
    pub still_missing: MissingDates,
    pub report: ReconciliationReport,
    /// Side channel of per-date vendor decode errors, in ticker order.
    pub errors: Vec<VendorFieldError>,
}

struct TickerOutcome {
    ticker: Ticker,
    still: BTreeSet<NaiveDate>,
    counts: TickerCounts,
    available: bool,
    errors: Vec<VendorFieldError>,
}

/// Subtract vendor coverage from the true-missing report.
///
/// - A ticker absent from `vendor`, or marked not available, carries its full
///   missing set forward unchanged and is listed in `not_available`.
/// - Per-date errors never count as coverage.
/// - A vendor entry for a ticker that is not in `true_missing` is a caller
///   contract violation.
pub fn reconcile(
    true_missing: &MissingDates,
    vendor: &VendorBatch,
) -> Result<Reconciliation, ReconcileError> {
    if let Some(ticker) = vendor.keys().find(|t| !true_missing.contains_key(*t)) {
        return Err(ReconcileError::UnrequestedTicker {
            ticker: ticker.clone(),
        });
    }

    let outcomes: Vec<TickerOutcome> = true_missing
        .par_iter()
        .map(|(ticker, before)| {
            let result = vendor.get(ticker);
            let covered = result.map(|r| r.covered_dates()).unwrap_or_default();
            let still: BTreeSet<NaiveDate> = before.difference(&covered).copied().collect();
            let counts = TickerCounts {
                before: before.len(),
                still_missing: still.len(),
                reduced: before.len() - still.len(),
            };
            TickerOutcome {
                ticker: ticker.clone(),
                still,
                counts,
                available: result.map_or(false, |r| r.is_available()),
                errors: result.map(|r| r.errors().to_vec()).unwrap_or_default(),
            }
        })
        .collect();

    let mut out = Reconciliation::default();
    for o in outcomes {
        let report = &mut out.report;
        report.total_before += o.counts.before;
        report.total_still_missing += o.counts.still_missing;
        report.total_reduced += o.counts.reduced;
        if o.still.is_empty() {
            report.filled.insert(o.ticker.clone());
        } else {
            report.incomplete.insert(o.ticker.clone());
        }
        if !o.available && !o.still.is_empty() {
            report.not_available.insert(o.ticker.clone());
        }
        report.per_ticker.insert(o.ticker.clone(), o.counts);
        out.errors.extend(o.errors);
        out.still_missing.insert(o.ticker, o.still);
    }

    Ok(out)
}

/// Still-missing map with the filled tickers removed, ready to persist.
pub fn still_missing_for_json(still_missing: &MissingDates, filled: &BTreeSet<Ticker>) -> MissingDates {
    still_missing
        .iter()
        .filter(|(t, _)| !filled.contains(*t))
        .map(|(t, d)| (t.clone(), d.clone()))
        .collect()
}

/// Totals for one backfill attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt: usize,
    pub vendor: String,
    pub missing_before: usize,
    pub missing_after: usize,
    pub reduced: usize,
    pub filled: usize,
}

/// Reduction of the missing set across successive backfill attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillLedger {
    pub attempts: Vec<AttemptSummary>,
}

impl BackfillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, vendor: &str, report: &ReconciliationReport) -> &AttemptSummary {
        self.attempts.push(AttemptSummary {
            attempt: self.attempts.len() + 1,
            vendor: vendor.to_string(),
            missing_before: report.total_before,
            missing_after: report.total_still_missing,
            reduced: report.total_reduced,
            filled: report.filled.len(),
        });
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn total_reduced(&self) -> usize {
        self.attempts.iter().map(|a| a.reduced).sum()
    }

    /// Missing count after the latest attempt, if any attempt was recorded.
    pub fn outstanding(&self) -> Option<usize> {
        self.attempts.last().map(|a| a.missing_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PricePoint, TickerSeries, VendorFetchResult};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn set(days: &[u32]) -> BTreeSet<NaiveDate> {
        days.iter().map(|&x| d(x)).collect()
    }

    fn fragment(ticker: &str, days: &[u32], error_days: &[u32]) -> VendorFetchResult {
        let points = days
            .iter()
            .map(|&x| PricePoint {
                date: d(x),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
            })
            .collect();
        let errors = error_days
            .iter()
            .map(|&x| VendorFieldError {
                ticker: ticker.into(),
                date: d(x),
                detail: "missing field fClose".into(),
            })
            .collect();
        VendorFetchResult::from_parts(TickerSeries::new(ticker, points), errors)
    }

    fn report() -> MissingDates {
        let mut m = MissingDates::new();
        m.insert("A".into(), set(&[2, 3, 6]));
        m.insert("B".into(), set(&[7]));
        m.insert("C".into(), set(&[8, 9]));
        m
    }

    #[test]
    fn classifies_filled_and_incomplete() {
        let mut vendor = VendorBatch::new();
        vendor.insert("A".into(), fragment("A", &[2, 3, 6, 10], &[]));
        vendor.insert("B".into(), fragment("B", &[], &[7]));

        let r = reconcile(&report(), &vendor).unwrap();

        assert!(r.still_missing["A"].is_empty());
        assert_eq!(r.still_missing["B"], set(&[7]));
        assert_eq!(r.still_missing["C"], set(&[8, 9]));

        assert_eq!(r.report.filled, ["A".to_string()].into_iter().collect());
        assert_eq!(
            r.report.incomplete,
            ["B".to_string(), "C".to_string()].into_iter().collect()
        );
        // C was never returned; B returned only errors but is still "offered"
        assert_eq!(r.report.not_available, ["C".to_string()].into_iter().collect());

        assert_eq!(r.report.per_ticker["A"].reduced, 3);
        assert_eq!(r.report.total_before, 6);
        assert_eq!(r.report.total_reduced, 3);
        assert_eq!(r.report.total_still_missing, 3);

        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.errors[0].date, d(7));
    }

    #[test]
    fn error_dates_stay_missing_even_inside_fragment() {
        let mut vendor = VendorBatch::new();
        vendor.insert("A".into(), fragment("A", &[2, 3], &[6]));
        let r = reconcile(&report(), &vendor).unwrap();
        assert_eq!(r.still_missing["A"], set(&[6]));
        assert_eq!(r.report.per_ticker["A"].reduced, 2);
    }

    #[test]
    fn explicit_not_available_carries_forward() {
        let mut vendor = VendorBatch::new();
        vendor.insert("C".into(), VendorFetchResult::NotAvailable);
        let r = reconcile(&report(), &vendor).unwrap();
        assert_eq!(r.still_missing["C"], set(&[8, 9]));
        assert!(r.report.not_available.contains("C"));
        assert_eq!(r.report.per_ticker["C"].reduced, 0);
    }

    #[test]
    fn unrequested_ticker_fails_loudly() {
        let mut vendor = VendorBatch::new();
        vendor.insert("ZZZ".into(), fragment("ZZZ", &[2], &[]));
        assert_eq!(
            reconcile(&report(), &vendor).unwrap_err(),
            ReconcileError::UnrequestedTicker {
                ticker: "ZZZ".into()
            }
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut vendor = VendorBatch::new();
        vendor.insert("A".into(), fragment("A", &[2], &[3]));
        let first = reconcile(&report(), &vendor).unwrap();
        let second = reconcile(&report(), &vendor).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn json_view_drops_filled() {
        let mut vendor = VendorBatch::new();
        vendor.insert("B".into(), fragment("B", &[7], &[]));
        let r = reconcile(&report(), &vendor).unwrap();
        let view = still_missing_for_json(&r.still_missing, &r.report.filled);
        assert!(!view.contains_key("B"));
        assert!(view.contains_key("A"));
    }

    #[test]
    fn ledger_tracks_successive_attempts() {
        let mut ledger = BackfillLedger::new();

        let mut first_vendor = VendorBatch::new();
        first_vendor.insert("A".into(), fragment("A", &[2, 3], &[]));
        let first = reconcile(&report(), &first_vendor).unwrap();
        ledger.record("iex", &first.report);

        let remaining = still_missing_for_json(&first.still_missing, &first.report.filled);
        let mut second_vendor = VendorBatch::new();
        second_vendor.insert("A".into(), fragment("A", &[6], &[]));
        let second = reconcile(&remaining, &second_vendor).unwrap();
        ledger.record("iex", &second.report);

        assert_eq!(ledger.attempts.len(), 2);
        assert_eq!(ledger.attempts[1].attempt, 2);
        assert_eq!(ledger.total_reduced(), 3);
        assert_eq!(ledger.outstanding(), Some(3));
    }
}
