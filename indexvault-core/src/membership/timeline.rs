//! Membership timeline: run-length encoding of per-record presence flags.
//!
//! For every ticker that appears anywhere in the history, the records are
//! scanned once in date order. A false→true transition opens an interval at
//! the current record's date; a true→false transition closes it at the date
//! of the last record that still listed the ticker. A run still open after
//! the final record closes at the final record's date.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use super::MembershipError;
use crate::domain::{MembershipInterval, MembershipRecord, Ticker};

/// Immutable ticker → membership intervals mapping, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipTimeline {
    intervals: BTreeMap<Ticker, Vec<MembershipInterval>>,
}

impl MembershipTimeline {
    /// Build the timeline from records ordered by strictly increasing `as_of`.
    ///
    /// Out-of-order or repeated dates are rejected: the transition logic is
    /// only meaningful over a date-ordered scan.
    pub fn build(records: &[MembershipRecord]) -> Result<Self, MembershipError> {
        validate_order(records)?;

        let tickers: BTreeSet<&Ticker> = records.iter().flat_map(|r| r.tickers.iter()).collect();

        let intervals = tickers
            .into_par_iter()
            .map(|ticker| (ticker.clone(), scan_ticker(ticker, records)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        Ok(Self { intervals })
    }

    /// Intervals for `ticker`, ordered by start date. Empty if it never appeared.
    pub fn intervals_for(&self, ticker: &str) -> &[MembershipInterval] {
        self.intervals.get(ticker).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether `date` falls inside one of the ticker's intervals.
    pub fn is_member(&self, ticker: &str, date: NaiveDate) -> bool {
        self.intervals_for(ticker).iter().any(|i| i.contains(date))
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.intervals.keys()
    }

    pub fn ticker_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn as_map(&self) -> &BTreeMap<Ticker, Vec<MembershipInterval>> {
        &self.intervals
    }
}

pub(crate) fn validate_order(records: &[MembershipRecord]) -> Result<(), MembershipError> {
    for pair in records.windows(2) {
        let (previous, date) = (pair[0].as_of, pair[1].as_of);
        if date == previous {
            return Err(MembershipError::DuplicateDate { date });
        }
        if date < previous {
            return Err(MembershipError::OutOfOrder { previous, date });
        }
    }
    Ok(())
}

/// Single forward scan carrying (previous flag, pending start).
fn scan_ticker(ticker: &str, records: &[MembershipRecord]) -> Vec<MembershipInterval> {
    let mut intervals = Vec::new();
    let mut pending: Option<(NaiveDate, usize)> = None;
    let mut last_present = None;

    for record in records {
        let present = record.contains(ticker);
        match (pending, present) {
            (None, true) => pending = Some((record.as_of, 1)),
            (Some((start, n)), true) => pending = Some((start, n + 1)),
            (Some((start, n)), false) => {
                if let Some(end) = last_present {
                    intervals.push(MembershipInterval {
                        ticker: ticker.to_string(),
                        start,
                        end,
                        observations: n,
                    });
                }
                pending = None;
            }
            (None, false) => {}
        }
        if present {
            last_present = Some(record.as_of);
        }
    }

    if let (Some((start, n)), Some(end)) = (pending, last_present) {
        intervals.push(MembershipInterval {
            ticker: ticker.to_string(),
            start,
            end,
            observations: n,
        });
    }

    intervals
}
