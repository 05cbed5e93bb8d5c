//! Ordinance check: a series must be strictly ascending by date.
//!
//! This is a verification step, never a repair. A violation means the merge
//! or the upstream data is wrong and the series must not be persisted.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::error;

use crate::domain::{Ticker, TickerSeries};

/// The first pair of consecutive dates that are equal or decreasing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ordinance violated for '{ticker}': {date} follows {previous}")]
pub struct OrdinanceViolation {
    pub ticker: Ticker,
    /// The offending date (the later of the pair, in stored order).
    pub date: NaiveDate,
    pub previous: NaiveDate,
}

/// Scan consecutive dates and stop at the first equal or decreasing pair.
pub fn check_ordinance(series: &TickerSeries) -> Result<(), OrdinanceViolation> {
    for pair in series.points.windows(2) {
        let (previous, date) = (pair[0].date, pair[1].date);
        if date <= previous {
            return Err(OrdinanceViolation {
                ticker: series.ticker.clone(),
                date,
                previous,
            });
        }
    }
    Ok(())
}

pub fn is_ordered(series: &TickerSeries) -> bool {
    check_ordinance(series).is_ok()
}

/// Check every series in ticker order, failing on the first violation.
pub fn check_all<'a, I>(series: I) -> Result<usize, OrdinanceViolation>
where
    I: IntoIterator<Item = &'a TickerSeries>,
{
    let mut checked = 0;
    for s in series {
        if let Err(violation) = check_ordinance(s) {
            error!(
                ticker = %violation.ticker,
                date = %violation.date,
                previous = %violation.previous,
                "ordinance check failed"
            );
            return Err(violation);
        }
        checked += 1;
    }
    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;

    fn series(dates: &[&str]) -> TickerSeries {
        TickerSeries::new(
            "A",
            dates
                .iter()
                .map(|s| PricePoint {
                    date: NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap(),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1,
                })
                .collect(),
        )
    }

    #[test]
    fn ascending_series_passes() {
        assert!(is_ordered(&series(&["2020-01-01", "2020-01-02", "2020-01-06"])));
        assert!(is_ordered(&series(&[])));
        assert!(is_ordered(&series(&["2020-01-01"])));
    }

    #[test]
    fn duplicate_date_is_reported() {
        let v = check_ordinance(&series(&["2020-01-01", "2020-01-01"])).unwrap_err();
        assert_eq!(v.ticker, "A");
        assert_eq!(v.date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn first_decreasing_pair_is_reported() {
        let v = check_ordinance(&series(&[
            "2020-01-01",
            "2020-01-03",
            "2020-01-02",
            "2019-12-31",
        ]))
        .unwrap_err();
        assert_eq!(v.date, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(v.previous, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
    }

    #[test]
    fn check_all_short_circuits() {
        let good = series(&["2020-01-01", "2020-01-02"]);
        let bad = series(&["2020-01-02", "2020-01-01"]);
        assert_eq!(check_all([&good, &good]).unwrap(), 2);
        assert!(check_all([&good, &bad, &good]).is_err());
    }
}
