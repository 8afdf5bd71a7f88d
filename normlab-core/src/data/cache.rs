//! On-disk price cache: one Parquet file per symbol plus a JSON sidecar.
//!
//! Layout:
//! - `{dir}/{SYMBOL}.parquet` with columns
//!   `date, open, high, low, close, volume, adj_close`
//! - `{dir}/{SYMBOL}.meta.json` with range, row count, BLAKE3 hash of the
//!   bars, source and write time
//!
//! Writes go to a `.tmp` file first and are renamed into place. A Parquet
//! file that fails to load is moved aside as `.quarantined` and reported as
//! not cached.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider::{DataError, DataSource, RawBar};

const COLUMNS: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "adj_close"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    /// BLAKE3 of the JSON-serialized bars.
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

/// How well the cached range covers a request.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

pub struct ParquetCache {
    dir: PathBuf,
}

impl ParquetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.meta.json"))
    }

    /// Replace the cached bars of `symbol`. Bars must be sorted by date.
    pub fn write(&self, symbol: &str, bars: &[RawBar], source: DataSource) -> Result<CacheMeta, DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError(format!("no bars to cache for {symbol}")));
        };
        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::CacheError(format!("failed to create {}: {e}", self.dir.display())))?;

        let mut df = bars_to_dataframe(bars)?;
        let path = self.data_path(symbol);
        let tmp = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp).map_err(|e| DataError::ParquetError(format!("create {}: {e}", tmp.display())))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(DataError::CacheError(format!("atomic rename failed: {e}")));
        }

        let encoded =
            serde_json::to_vec(bars).map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: blake3::hash(&encoded).to_hex().to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), json).map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        tracing::debug!(symbol, rows = bars.len(), path = %path.display(), "wrote cache");
        Ok(meta)
    }

    /// All cached bars of `symbol`, ascending.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let path = self.data_path(symbol);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        match read_parquet(&path) {
            Ok(mut bars) => {
                bars.sort_by_key(|b| b.date);
                tracing::debug!(symbol, rows = bars.len(), "cache hit");
                Ok(bars)
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                tracing::warn!(
                    symbol,
                    path = %path.display(),
                    error = %e,
                    "quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                let _ = fs::remove_file(self.meta_path(symbol));
                Err(DataError::NoCachedData {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    pub fn meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start_date <= start && meta.end_date >= end => CoverageResult::FullyCovered,
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            },
        }
    }

    pub fn status(&self, symbols: &[String]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|symbol| {
                let meta = self.meta(symbol);
                CacheStatus {
                    symbol: symbol.clone(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }

    /// Symbols with a metadata sidecar, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut out: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(".meta.json"))
                    .map(str::to_string)
            })
            .collect();
        out.sort();
        out
    }

    /// Delete a symbol's data and sidecar. Returns whether anything existed.
    pub fn remove(&self, symbol: &str) -> Result<bool, DataError> {
        let mut removed = false;
        for path in [self.data_path(symbol), self.meta_path(symbol)] {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| DataError::CacheError(format!("remove {}: {e}", path.display())))?;
                removed = true;
            }
        }
        Ok(removed)
    }
}

// ── Parquet conversion ───────────────────────────────────────────────

/// Days since 1970-01-01, the physical encoding of a Polars `Date`.
fn epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn float_column(name: &str, bars: &[RawBar], field: fn(&RawBar) -> f64) -> Column {
    Column::new(name.into(), bars.iter().map(field).collect::<Vec<f64>>())
}

fn bars_to_dataframe(bars: &[RawBar]) -> Result<DataFrame, DataError> {
    let dates = Column::new("date".into(), bars.iter().map(|b| epoch_days(b.date)).collect::<Vec<i32>>())
        .cast(&DataType::Date)
        .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?;
    let volume = Column::new("volume".into(), bars.iter().map(|b| b.volume).collect::<Vec<u64>>());

    DataFrame::new(vec![
        dates,
        float_column("open", bars, |b| b.open),
        float_column("high", bars, |b| b.high),
        float_column("low", bars, |b| b.low),
        float_column("close", bars, |b| b.close),
        volume,
        float_column("adj_close", bars, |b| b.adj_close),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn read_parquet(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;
    if df.height() == 0 {
        return Err(DataError::ParquetError("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::ParquetError(format!("missing column '{name}'")));
        }
    }
    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<RawBar>, DataError> {
    let err = |what: &str, e: PolarsError| DataError::ParquetError(format!("{what} column: {e}"));
    let float = |name: &str| -> Result<Vec<f64>, DataError> {
        let ca = df.column(name).and_then(|c| c.f64()).map_err(|e| err(name, e))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };

    let dates = df.column("date").and_then(|c| c.date()).map_err(|e| err("date", e))?;
    let volume = df.column("volume").and_then(|c| c.u64()).map_err(|e| err("volume", e))?;
    let open = float("open")?;
    let high = float("high")?;
    let low = float("low")?;
    let close = float("close")?;
    let adj_close = float("adj_close")?;

    let epoch = NaiveDate::default();
    (0..df.height())
        .map(|i| {
            let days = dates
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(RawBar {
                date: epoch + chrono::Duration::days(i64::from(days)),
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                volume: volume.get(i).unwrap_or(0),
                adj_close: adj_close[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_bars() -> Vec<RawBar> {
        let mut a = RawBar::close_only(d(2), 101.0);
        a.adj_close = 100.5;
        a.volume = 1000;
        let b = RawBar::close_only(d(3), 102.0);
        vec![a, b]
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].date, d(2));
        assert_eq!(loaded[0].adj_close, 100.5);
        assert_eq!(loaded[0].volume, 1000);
        assert!(loaded[1].adj_close.is_nan());
        assert!(dir.path().join("SPY.parquet").exists());
        assert!(!dir.path().join("SPY.parquet.tmp").exists());
    }

    #[test]
    fn meta_records_range_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let written = cache.write("SPY", &sample_bars(), DataSource::CsvImport).unwrap();
        let meta = cache.meta("SPY").unwrap();
        assert_eq!(meta, written);
        assert_eq!(meta.bar_count, 2);
        assert_eq!(meta.start_date, d(2));
        assert_eq!(meta.end_date, d(3));
        assert_eq!(meta.source, DataSource::CsvImport);
        assert_eq!(meta.data_hash.len(), 64);
    }

    #[test]
    fn missing_symbol_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(cache.load("QQQ"), Err(DataError::NoCachedData { .. })));
        assert_eq!(cache.covers_range("QQQ", d(1), d(2)), CoverageResult::NotCached);
    }

    #[test]
    fn coverage_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();

        assert_eq!(cache.covers_range("SPY", d(2), d(3)), CoverageResult::FullyCovered);
        assert_eq!(
            cache.covers_range("SPY", d(1), d(3)),
            CoverageResult::PartiallyCovered {
                cached_start: d(2),
                cached_end: d(3)
            }
        );

        let status = cache.status(&["SPY".into(), "QQQ".into()]);
        assert!(status[0].cached);
        assert_eq!(status[0].bar_count, Some(2));
        assert!(!status[1].cached);
        assert_eq!(cache.symbols(), vec!["SPY"]);
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();
        fs::write(dir.path().join("SPY.parquet"), b"not parquet").unwrap();

        assert!(matches!(cache.load("SPY"), Err(DataError::NoCachedData { .. })));
        assert!(dir.path().join("SPY.parquet.quarantined").exists());
        assert!(cache.meta("SPY").is_none());
    }

    #[test]
    fn remove_deletes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();
        assert!(cache.remove("SPY").unwrap());
        assert!(!cache.remove("SPY").unwrap());
        assert!(cache.symbols().is_empty());
    }

    #[test]
    fn empty_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(cache.write("SPY", &[], DataSource::Cache).is_err());
    }
}
