//! Yahoo Finance provider, the primary vendor.
//!
//! Fetches daily bars from Yahoo's v8 chart API and adjusts OHLC by the
//! `adjclose / close` ratio so stored prices are split and dividend adjusted.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::http::JsonFetcher;
use super::provider::{DataError, VendorProvider};
use crate::domain::{PricePoint, TickerSeries, VendorFetchResult, VendorFieldError};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    http: JsonFetcher,
    base_url: String,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: JsonFetcher::new(circuit_breaker, Duration::from_secs(30))?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.http = self.http.with_retries(max_retries, base_delay);
        self
    }

    fn query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp()
            + 86_399;
        vec![
            ("period1", start_ts.to_string()),
            ("period2", end_ts.to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ]
    }
}

/// Decode a chart response into an adjusted series plus per-date errors.
///
/// Rows where every field is null are non-trading days and are skipped. Rows
/// with some price fields null become per-date errors.
fn parse_response(ticker: &str, resp: ChartResponse) -> Result<VendorFetchResult, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => return Ok(VendorFetchResult::NotAvailable),
        (None, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(VendorFetchResult::NotAvailable);
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(VendorFetchResult::NotAvailable);
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut points = Vec::with_capacity(timestamps.len());
    let mut errors = Vec::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();
        let adj_close = adj_closes.as_ref().map(|v| v.get(i).copied().flatten());

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            let absent: Vec<&str> = [("open", open), ("high", high), ("low", low), ("close", close)]
                .iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| *name)
                .collect();
            errors.push(VendorFieldError {
                ticker: ticker.to_string(),
                date,
                detail: format!("missing field(s) {}", absent.join(",")),
            });
            continue;
        };

        let factor = match adj_close {
            None => 1.0,
            Some(Some(adj)) if close != 0.0 => adj / close,
            Some(_) => {
                errors.push(VendorFieldError {
                    ticker: ticker.to_string(),
                    date,
                    detail: "missing field adjclose".into(),
                });
                continue;
            }
        };

        points.push(PricePoint {
            date,
            open: open * factor,
            high: high * factor,
            low: low * factor,
            close: close * factor,
            volume: volume.unwrap_or(0),
        });
    }

    Ok(VendorFetchResult::from_parts(
        TickerSeries::new(ticker, points),
        errors,
    ))
}

impl VendorProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch_ticker(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorFetchResult, DataError> {
        let url = format!("{}/{ticker}", self.base_url);
        match self.http.get_json::<ChartResponse>(&url, &Self::query(start, end), ticker)? {
            None => Ok(VendorFetchResult::NotAvailable),
            Some(chart) => parse_response(ticker, chart),
        }
    }

    fn is_available(&self) -> bool {
        self.http.breaker().is_allowed()
    }
}
