//! Synthetic provider for offline dry runs.
//!
//! Produces a deterministic random walk from 100.0 on weekdays only, seeded
//! from the ticker name. Output is clearly fake; the vendor name `synthetic`
//! ends up in attendance logs and container metadata.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use super::provider::{DataError, VendorProvider};
use crate::domain::{PricePoint, Ticker, TickerSeries, VendorFetchResult};

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    /// Tickers reported as not available.
    unavailable: BTreeSet<Ticker>,
    /// Dates dropped from every generated series, to simulate vendor holes.
    holes: BTreeSet<NaiveDate>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unavailable<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Ticker>,
    {
        self.unavailable.extend(tickers.into_iter().map(Into::into));
        self
    }

    pub fn with_holes(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holes.extend(dates);
        self
    }

    fn generate(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut points = Vec::new();
        let mut price = 100.0_f64;

        for date in start.iter_days().take_while(|d| *d <= end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);
            price = close;

            if self.holes.contains(&date) {
                continue;
            }
            points.push(PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        points
    }
}

impl VendorProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_ticker(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorFetchResult, DataError> {
        if self.unavailable.contains(ticker) {
            return Ok(VendorFetchResult::NotAvailable);
        }
        let series = TickerSeries::new(ticker, self.generate(ticker, start, end));
        Ok(VendorFetchResult::from_parts(series, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::is_ordered;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn weekdays_only_and_deterministic() {
        let p = SyntheticProvider::new();
        let a = p.fetch_ticker("SPY", d(1), d(14)).unwrap();
        let b = p.fetch_ticker("SPY", d(1), d(14)).unwrap();
        assert_eq!(a, b);

        let series = a.series().unwrap();
        assert_eq!(series.len(), 10);
        assert!(series.points.iter().all(|pt| pt.is_sane()));
        assert!(is_ordered(series));
    }

    #[test]
    fn holes_and_unavailable() {
        let p = SyntheticProvider::new()
            .with_unavailable(["GONE"])
            .with_holes([d(3)]);
        assert_eq!(
            p.fetch_ticker("GONE", d(1), d(5)).unwrap(),
            VendorFetchResult::NotAvailable
        );
        let dates = p.fetch_ticker("SPY", d(1), d(5)).unwrap().covered_dates();
        assert!(!dates.contains(&d(3)));
        assert_eq!(dates.len(), 4);
    }

    #[test]
    fn default_batch_covers_every_ticker() {
        let p = SyntheticProvider::new().with_unavailable(["B"]);
        let batch = p
            .fetch_batch(&["A".to_string(), "B".to_string()], d(1), d(5))
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(!batch["B"].is_available());
    }
}
