//! Series merger: combine a primary and a secondary series for one ticker.
//!
//! Precedence is positional. On a date collision the earlier source wins, so
//! `merge_chain(&[a, b, c])` prefers `a` over `b` over `c`, which equals
//! `merge_series(&merge_series(a, b)?, c)`.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;

use super::ReconcileError;
use crate::domain::{PricePoint, Ticker, TickerSeries};

/// Merge two series for the same ticker. Primary points win on shared dates;
/// the result is strictly ascending by date.
///
/// Within a single input, the first occurrence of a repeated date wins too.
pub fn merge_series(
    primary: &TickerSeries,
    secondary: &TickerSeries,
) -> Result<TickerSeries, ReconcileError> {
    merge_chain(&[primary, secondary])
}

/// Merge any number of series for one ticker, earlier sources taking precedence.
///
/// An empty slice has no ticker to report and is treated as a caller bug.
pub fn merge_chain(sources: &[&TickerSeries]) -> Result<TickerSeries, ReconcileError> {
    let Some(first) = sources.first() else {
        return Err(ReconcileError::UnknownTicker {
            ticker: String::new(),
        });
    };

    if let Some(other) = sources.iter().find(|s| s.ticker != first.ticker) {
        return Err(ReconcileError::TickerMismatch {
            primary: first.ticker.clone(),
            secondary: other.ticker.clone(),
        });
    }

    let mut by_date: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
    for source in sources {
        for point in &source.points {
            by_date.entry(point.date).or_insert(*point);
        }
    }

    Ok(TickerSeries::new(
        first.ticker.clone(),
        by_date.into_values().collect(),
    ))
}

/// Merge every ticker of `primary` with its counterpart in `secondary`.
///
/// Tickers present on only one side pass through (sorted and de-duplicated).
pub fn merge_all(
    primary: &BTreeMap<Ticker, TickerSeries>,
    secondary: &BTreeMap<Ticker, TickerSeries>,
) -> Result<BTreeMap<Ticker, TickerSeries>, ReconcileError> {
    let tickers: Vec<&Ticker> = primary
        .keys()
        .chain(secondary.keys().filter(|t| !primary.contains_key(*t)))
        .collect();

    tickers
        .into_par_iter()
        .map(|ticker| {
            let merged = match (primary.get(ticker), secondary.get(ticker)) {
                (Some(p), Some(s)) => merge_series(p, s)?,
                (Some(only), None) | (None, Some(only)) => merge_chain(&[only])?,
                (None, None) => {
                    return Err(ReconcileError::UnknownTicker {
                        ticker: ticker.clone(),
                    })
                }
            };
            Ok((ticker.clone(), merged))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|v| v.into_iter().collect())
}
