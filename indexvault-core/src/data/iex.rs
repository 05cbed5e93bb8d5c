//! IEX Cloud provider, the backfill vendor.
//!
//! Tickers are requested through the market batch endpoint
//! (`types=chart&range=...`) in partitions of at most [`MAX_BATCH_SIZE`].
//! Adjusted fields are `fOpen, fHigh, fLow, fClose, fVolume`; a bar missing any
//! of them becomes a per-date error. A ticker absent from the response, or
//! present with an empty chart, is not available from this vendor. Any HTTP
//! failure aborts the whole run with the index of the failing batch.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::circuit_breaker::CircuitBreaker;
use super::http::JsonFetcher;
use super::provider::{partition, DataError, VendorProvider};
use crate::domain::{
    PricePoint, Ticker, TickerSeries, VendorBatch, VendorFetchResult, VendorFieldError,
};

pub const DEFAULT_BASE_URL: &str = "https://cloud.iexapis.com/stable";
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    chart: Vec<ChartBar>,
}

#[derive(Debug, Deserialize)]
struct ChartBar {
    date: NaiveDate,
    #[serde(rename = "fOpen")]
    f_open: Option<f64>,
    #[serde(rename = "fHigh")]
    f_high: Option<f64>,
    #[serde(rename = "fLow")]
    f_low: Option<f64>,
    #[serde(rename = "fClose")]
    f_close: Option<f64>,
    #[serde(rename = "fVolume")]
    f_volume: Option<f64>,
}

type BatchResponse = BTreeMap<String, BatchEntry>;

pub struct IexProvider {
    http: JsonFetcher,
    base_url: String,
    token: String,
    range: String,
    batch_size: usize,
}

impl IexProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, token: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            http: JsonFetcher::new(circuit_breaker, Duration::from_secs(60))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            range: "max".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Read the token from the environment variable `var`.
    pub fn from_env(circuit_breaker: Arc<CircuitBreaker>, var: &str) -> Result<Self, DataError> {
        let token = std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DataError::MissingToken { var: var.to_string() })?;
        Self::new(circuit_breaker, token)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, DataError> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(DataError::InvalidBatchSize {
                size: batch_size,
                max: MAX_BATCH_SIZE,
            });
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// IEX chart range keyword (`max`, `5y`, `1y`, ...).
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.http = self.http.with_retries(max_retries, base_delay);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn fetch_partition(&self, tickers: &[Ticker]) -> Result<BatchResponse, DataError> {
        let url = format!("{}/stock/market/batch", self.base_url);
        let query = [
            ("symbols", tickers.join(",")),
            ("types", "chart".to_string()),
            ("range", self.range.clone()),
            ("token", self.token.clone()),
        ];
        Ok(self
            .http
            .get_json::<BatchResponse>(&url, &query, "iex batch")?
            .unwrap_or_default())
    }
}

/// Decode one ticker's chart, clipped to `[start, end]`.
fn decode_chart(ticker: &str, chart: &[ChartBar], start: NaiveDate, end: NaiveDate) -> VendorFetchResult {
    let mut points = Vec::with_capacity(chart.len());
    let mut errors = Vec::new();

    for bar in chart.iter().filter(|b| b.date >= start && b.date <= end) {
        let fields = [
            ("fOpen", bar.f_open),
            ("fHigh", bar.f_high),
            ("fLow", bar.f_low),
            ("fClose", bar.f_close),
            ("fVolume", bar.f_volume),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.is_none()) {
            warn!(ticker, date = %bar.date, field = name, "missing adjusted field");
            errors.push(VendorFieldError {
                ticker: ticker.to_string(),
                date: bar.date,
                detail: format!("missing field {name}"),
            });
            continue;
        }
        points.push(PricePoint {
            date: bar.date,
            open: bar.f_open.unwrap_or(f64::NAN),
            high: bar.f_high.unwrap_or(f64::NAN),
            low: bar.f_low.unwrap_or(f64::NAN),
            close: bar.f_close.unwrap_or(f64::NAN),
            volume: bar.f_volume.unwrap_or(0.0).max(0.0).round() as u64,
        });
    }

    VendorFetchResult::from_parts(TickerSeries::new(ticker, points), errors)
}

/// Map a raw batch response onto the requested tickers.
///
/// Response keys are matched case-insensitively. Keys nobody asked for are dropped.
fn assemble(
    requested: &[Ticker],
    response: BatchResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> VendorBatch {
    let mut by_key: BTreeMap<String, (String, BatchEntry)> = response
        .into_iter()
        .map(|(key, entry)| (key.to_uppercase(), (key, entry)))
        .collect();
    let mut batch = VendorBatch::new();
    for ticker in requested {
        let result = match by_key.remove(&ticker.to_uppercase()) {
            Some((_, entry)) => decode_chart(ticker, &entry.chart, start, end),
            None => VendorFetchResult::NotAvailable,
        };
        batch.insert(ticker.clone(), result);
    }
    for (extra, _) in by_key.values() {
        warn!(ticker = %extra, "vendor returned unrequested ticker; dropped");
    }
    batch
}

impl VendorProvider for IexProvider {
    fn name(&self) -> &str {
        "iex"
    }

    fn fetch_ticker(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorFetchResult, DataError> {
        let requested = [ticker.to_string()];
        let mut batch = self.fetch_batch(&requested, start, end)?;
        Ok(batch.remove(ticker).unwrap_or(VendorFetchResult::NotAvailable))
    }

    fn fetch_batch(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VendorBatch, DataError> {
        let partitions = partition(tickers, self.batch_size)?;
        let total = partitions.len();
        let mut out = VendorBatch::new();

        for (index, part) in partitions.into_iter().enumerate() {
            debug!(batch = index, total, tickers = part.len(), "requesting iex batch");
            let response = self.fetch_partition(part).map_err(|e| DataError::BatchFailed {
                vendor: self.name().to_string(),
                batch: index,
                source: Box::new(e),
            })?;
            out.extend(assemble(part, response, start, end));
        }

        let available = out.values().filter(|r| r.is_available()).count();
        info!(requested = tickers.len(), available, batches = total, "iex download finished");
        Ok(out)
    }

    fn is_available(&self) -> bool {
        self.http.breaker().is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "AAPL": {"chart": [
            {"date": "2020-01-02", "fOpen": 1.0, "fHigh": 2.0, "fLow": 0.5, "fClose": 1.5, "fVolume": 100},
            {"date": "2020-01-03", "fOpen": 1.0, "fHigh": 2.0, "fLow": 0.5, "fVolume": 100},
            {"date": "2021-06-01", "fOpen": 1.0, "fHigh": 2.0, "fLow": 0.5, "fClose": 1.5, "fVolume": 100}
        ]},
        "EMPTY": {"chart": []},
        "ZZZ": {"chart": []}
    }"#;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tickers(names: &[&str]) -> Vec<Ticker> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn assemble_classifies_every_requested_ticker() {
        let response: BatchResponse = serde_json::from_str(BODY).unwrap();
        let batch = assemble(
            &tickers(&["AAPL", "EMPTY", "GONE"]),
            response,
            d("2020-01-01"),
            d("2020-12-31"),
        );

        assert_eq!(batch.len(), 3);
        assert!(!batch.contains_key("ZZZ"));

        let aapl = &batch["AAPL"];
        let series = aapl.series().unwrap();
        // 2021 bar is outside the window
        assert_eq!(series.len(), 1);
        assert_eq!(series.points[0].volume, 100);
        assert_eq!(aapl.errors().len(), 1);
        assert_eq!(aapl.errors()[0].detail, "missing field fClose");

        assert_eq!(batch["EMPTY"], VendorFetchResult::NotAvailable);
        assert_eq!(batch["GONE"], VendorFetchResult::NotAvailable);
    }

    #[test]
    fn lowercase_request_matches_uppercase_key() {
        let response: BatchResponse = serde_json::from_str(BODY).unwrap();
        let batch = assemble(&tickers(&["aapl"]), response, d("2020-01-01"), d("2020-12-31"));
        assert!(batch["aapl"].is_available());
    }

    #[test]
    fn uppercase_request_matches_lowercase_key() {
        let response: BatchResponse = serde_json::from_str(
            r#"{"brk.b": {"chart": [
                {"date": "2020-01-02", "fOpen": 1.0, "fHigh": 2.0, "fLow": 0.5, "fClose": 1.5, "fVolume": 100}
            ]}}"#,
        )
        .unwrap();
        let batch = assemble(&tickers(&["BRK.B"]), response, d("2020-01-01"), d("2020-12-31"));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["BRK.B"].series().unwrap().len(), 1);
    }

    #[test]
    fn batch_size_is_bounded() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let provider = IexProvider::new(breaker, "t").unwrap();
        assert_eq!(provider.batch_size(), DEFAULT_BATCH_SIZE);
        assert!(provider.with_batch_size(101).is_err());
    }

    #[test]
    fn missing_token_is_reported() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let err = IexProvider::from_env(breaker, "INDEXVAULT_TEST_UNSET_TOKEN").err().unwrap();
        assert!(matches!(err, DataError::MissingToken { .. }));
    }
}
