//! Gap detection and backfill reconciliation.
//!
//! Pipeline, per run:
//! 1. [`calendar`]: stored dates vs. the expected trading calendar → raw gaps
//! 2. [`filter`]: raw gaps ∩ membership intervals → true gaps
//! 3. [`backfill`]: true gaps − dates a secondary vendor covered → still missing
//! 4. [`merge`]: primary and secondary series → one series per ticker
//! 5. [`ordinance`]: verify the merged series is strictly ascending
//!
//! Everything here is pure and synchronous. Per-ticker work is independent
//! and runs on rayon; outputs are collected into `BTreeMap`s so results do
//! not depend on scheduling.

pub mod backfill;
pub mod calendar;
pub mod filter;
pub mod merge;
pub mod ordinance;

pub use backfill::{
    reconcile, still_missing_for_json, AttemptSummary, BackfillLedger, Reconciliation,
    ReconciliationReport, TickerCounts,
};
pub use calendar::{missing_by_ticker, missing_dates, reference_calendar, union_calendar};
pub use filter::filter_to_membership;
pub use merge::{merge_all, merge_chain, merge_series};
pub use ordinance::{check_all, check_ordinance, is_ordered, OrdinanceViolation};

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::domain::Ticker;

/// Ticker → set of dates. Used for both raw and membership-filtered gaps.
pub type MissingDates = BTreeMap<Ticker, BTreeSet<NaiveDate>>;

/// Caller contract violations in the reconciliation pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("vendor returned '{ticker}', which was not in the missing-date report")]
    UnrequestedTicker { ticker: Ticker },

    #[error("cannot merge series for different tickers: '{primary}' and '{secondary}'")]
    TickerMismatch { primary: Ticker, secondary: Ticker },

    #[error("ticker '{ticker}' is not in the loaded data")]
    UnknownTicker { ticker: Ticker },

    #[error("reference ticker '{ticker}' has no stored dates")]
    EmptyReference { ticker: Ticker },
}

/// Total number of dates across all tickers.
pub fn total_dates(missing: &MissingDates) -> usize {
    missing.values().map(|d| d.len()).sum()
}
