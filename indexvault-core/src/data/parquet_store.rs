//! Parquet container with a metadata sidecar per ticker.
//!
//! Layout: `{root}/{ticker}.parquet` and `{root}/{ticker}.meta.json`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Schema check on load
//! - Sidecar carries date range, bar count, blake3 content hash and source

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::DataError;
use super::store::{write_atomic, ContainerFormat, SeriesStore};
use crate::domain::{PricePoint, TickerSeries};

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a stored ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub ticker: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: String,
    pub stored_at: chrono::NaiveDateTime,
}

pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn meta_path(&self, ticker: &str) -> PathBuf {
        self.root.join(format!("{ticker}.meta.json"))
    }

    /// Sidecar metadata, if the ticker has been stored.
    pub fn meta(&self, ticker: &str) -> Option<SeriesMeta> {
        let content = fs::read_to_string(self.meta_path(ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// BLAKE3 over the JSON encoding of the points, in stored order.
pub fn content_hash(series: &TickerSeries) -> Result<String, DataError> {
    Ok(blake3::hash(&serde_json::to_vec(&series.points)?)
        .to_hex()
        .to_string())
}

impl SeriesStore for ParquetStore {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Parquet
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, ticker: &str, series: &TickerSeries, source: &str) -> Result<(), DataError> {
        let mut df = series_to_dataframe(series)?;
        write_atomic(&self.path_for(ticker), |tmp| write_parquet(&mut df, tmp))?;

        let meta = SeriesMeta {
            ticker: ticker.to_string(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            bar_count: series.len(),
            data_hash: content_hash(series)?,
            source: source.to_string(),
            stored_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        write_atomic(&self.meta_path(ticker), |tmp| Ok(fs::write(tmp, meta_json)?))
    }

    fn load(&self, ticker: &str) -> Result<TickerSeries, DataError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(DataError::NotStored {
                ticker: ticker.to_string(),
            });
        }
        let points = load_and_validate_parquet(&path)?;
        Ok(TickerSeries::new(ticker, points))
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn series_to_dataframe(series: &TickerSeries) -> Result<DataFrame, DataError> {
    let pts = &series.points;
    let dates: Vec<i32> = pts
        .iter()
        .map(|p| (p.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = pts.iter().map(|p| p.open).collect();
    let highs: Vec<f64> = pts.iter().map(|p| p.high).collect();
    let lows: Vec<f64> = pts.iter().map(|p| p.low).collect();
    let closes: Vec<f64> = pts.iter().map(|p| p.close).collect();
    let volumes: Vec<u64> = pts.iter().map(|p| p.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read {}: {e}", path.display())))?;

    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::Parquet(format!(
                "{}: missing column '{name}'",
                path.display()
            )));
        }
    }

    dataframe_to_points(&df)
}

fn dataframe_to_points(df: &DataFrame) -> Result<Vec<PricePoint>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::Parquet(format!("column read: {e}")))
    };
    let typed = |name: &str, e: PolarsError| DataError::Parquet(format!("{name} column type: {e}"));

    let date_ca = col("date")?.date().map_err(|e| typed("date", e))?;
    let open_ca = col("open")?.f64().map_err(|e| typed("open", e))?;
    let high_ca = col("high")?.f64().map_err(|e| typed("high", e))?;
    let low_ca = col("low")?.f64().map_err(|e| typed("low", e))?;
    let close_ca = col("close")?.f64().map_err(|e| typed("close", e))?;
    let vol_ca = col("volume")?.u64().map_err(|e| typed("volume", e))?;

    let epoch = epoch();
    let mut points = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null date at row {i}")))?;
        let null = |name: &str| DataError::Parquet(format!("null {name} at row {i}"));
        points.push(PricePoint {
            date: epoch + chrono::Duration::days(days as i64),
            open: open_ca.get(i).ok_or_else(|| null("open"))?,
            high: high_ca.get(i).ok_or_else(|| null("high"))?,
            low: low_ca.get(i).ok_or_else(|| null("low"))?,
            close: close_ca.get(i).ok_or_else(|| null("close"))?,
            volume: vol_ca.get(i).ok_or_else(|| null("volume"))?,
        });
    }

    Ok(points)
}
