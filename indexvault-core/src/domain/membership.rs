//! Index membership snapshots and the intervals derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Ticker;
use crate::membership::MembershipError;

/// The index roster as observed on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub as_of: NaiveDate,
    pub tickers: BTreeSet<Ticker>,
}

impl MembershipRecord {
    /// Build a record, rejecting empty and duplicate symbols.
    pub fn new<I, S>(as_of: NaiveDate, symbols: I) -> Result<Self, MembershipError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tickers = BTreeSet::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            if symbol.is_empty() {
                return Err(MembershipError::EmptySymbol { date: as_of });
            }
            if !tickers.insert(symbol.to_string()) {
                return Err(MembershipError::DuplicateSymbol {
                    date: as_of,
                    symbol: symbol.to_string(),
                });
            }
        }
        Ok(Self { as_of, tickers })
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }
}

/// A maximal run of consecutive records in which `ticker` was present.
///
/// `observations` counts the records covered by the run, so summing it over a
/// ticker's intervals gives the number of records that list the ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipInterval {
    pub ticker: Ticker,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub observations: usize,
}

impl MembershipInterval {
    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
