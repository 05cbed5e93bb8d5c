//! Vendor clients, containers and the download stage.

pub mod attendance;
pub mod circuit_breaker;
pub mod csv_store;
pub mod download;
pub mod http;
pub mod iex;
pub mod parquet_store;
pub mod provider;
pub mod store;
pub mod synthetic;
pub mod yahoo;

pub use attendance::{append_attendance, attendance_path, read_attendance, record_attendance, Attendance};
pub use circuit_breaker::CircuitBreaker;
pub use csv_store::CsvStore;
pub use download::{download_universe, DownloadSummary};
pub use iex::IexProvider;
pub use parquet_store::{ParquetStore, SeriesMeta};
pub use provider::{
    partition, DataError, DownloadProgress, StdoutProgress, TracingProgress, VendorProvider,
};
pub use store::{open_store, verify_saved, ContainerFormat, LoadedSeries, SeriesStore};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
