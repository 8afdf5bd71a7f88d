//! Price data layer: providers, ingest, alignment and the Parquet cache.
//!
//! None of the statistics depend on this module; it only produces
//! [`PriceSeries`](crate::domain::PriceSeries) and
//! [`PriceTable`](crate::domain::PriceTable) values for them.

pub mod align;
pub mod cache;
pub mod csv_import;
pub mod download;
pub mod ingest;
pub mod provider;
pub mod yahoo;

pub use align::align_series;
pub use cache::{CacheMeta, CacheStatus, CoverageResult, ParquetCache};
pub use csv_import::import_csv;
pub use download::{download_one, download_symbols, DownloadSummary};
pub use ingest::{clean_bars, to_price_series, IngestReport};
pub use provider::{
    DataError, DataSource, DownloadProgress, FetchResult, LogProgress, PriceProvider, RawBar, SilentProgress,
};
pub use yahoo::YahooProvider;
