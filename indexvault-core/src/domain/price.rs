//! PricePoint and TickerSeries, the per-ticker daily bar data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Ticker;

/// One trading day's adjusted OHLCV bar for one ticker.
///
/// OHLC values are split/dividend adjusted by the vendor layer before they
/// reach this type; there is no separate `adj_close` column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, open and close inside the range, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Date-indexed sequence of price points for a single ticker.
///
/// Points are kept in the order they were produced (vendor order, file order,
/// or merge order). Only [`crate::reconcile::merge_series`] guarantees strict
/// ascending order; use [`crate::reconcile::check_ordinance`] to verify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSeries {
    pub ticker: Ticker,
    pub points: Vec<PricePoint>,
}

impl TickerSeries {
    pub fn new(ticker: impl Into<Ticker>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn empty(ticker: impl Into<Ticker>) -> Self {
        Self::new(ticker, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The stored date index as a set.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Dates in stored order, duplicates included.
    pub fn date_index(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.iter().map(|p| p.date).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.iter().map(|p| p.date).max()
    }

    /// Keep only points with `start <= date <= end`.
    pub fn clipped(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }
}
