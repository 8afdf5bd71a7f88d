//! Multi-symbol download: fetch, clean, cache.

use chrono::NaiveDate;

use super::cache::{CoverageResult, ParquetCache};
use super::ingest::clean_bars;
use super::provider::{DataError, DownloadProgress, PriceProvider};

#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Symbols already cached for the whole range and left alone.
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Download `symbols` one after another into `cache`.
///
/// Unless `force` is set, a symbol whose cache already covers
/// `[start, end]` is not fetched again. One symbol failing does not stop
/// the batch; the error is collected in the summary.
pub fn download_symbols(
    provider: &dyn PriceProvider,
    cache: &ParquetCache,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut summary = DownloadSummary {
        total,
        succeeded: 0,
        skipped: 0,
        failed: 0,
        errors: Vec::new(),
    };

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !force && cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
            tracing::debug!(symbol = %symbol, "cache covers range, skipping download");
            progress.on_complete(symbol, i, total, &Ok(()));
            summary.succeeded += 1;
            summary.skipped += 1;
            continue;
        }

        let result = download_one(provider, cache, symbol, start, end);
        progress.on_complete(symbol, i, total, &result);
        match result {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                summary.failed += 1;
                summary.errors.push((symbol.clone(), e));
            }
        }
    }

    progress.on_batch_complete(summary.succeeded, summary.failed, total);
    summary
}

/// Fetch one symbol and write the cleaned bars to the cache.
pub fn download_one(
    provider: &dyn PriceProvider,
    cache: &ParquetCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DataError> {
    let fetched = provider.fetch(symbol, start, end)?;
    let (bars, report) = clean_bars(fetched.bars);
    if !bars.iter().any(|b| b.price() > 0.0) {
        return Err(DataError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }
    if report.duplicates_dropped > 0 {
        tracing::warn!(symbol, duplicates = report.duplicates_dropped, "dropped duplicate dates");
    }
    cache.write(symbol, &bars, fetched.source)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, FetchResult, RawBar, SilentProgress};

    /// Serves a fixed ramp of closes; fails for "BAD".
    struct FixedProvider;

    impl PriceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, symbol: &str, start: NaiveDate, _end: NaiveDate) -> Result<FetchResult, DataError> {
            if symbol == "BAD" {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.into(),
                });
            }
            let bars = (0..5)
                .map(|i| RawBar::close_only(start + chrono::Duration::days(i), 100.0 + i as f64))
                .collect();
            Ok(FetchResult {
                symbol: symbol.into(),
                bars,
                source: DataSource::YahooFinance,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn failures_are_collected_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let symbols = vec!["SPY".to_string(), "BAD".to_string(), "QQQ".to_string()];

        let summary = download_symbols(&FixedProvider, &cache, &symbols, start, end, false, &SilentProgress);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].0, "BAD");
        assert!(!summary.all_succeeded());
        assert_eq!(cache.load("QQQ").unwrap().len(), 5);
    }

    #[test]
    fn covered_symbols_are_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let symbols = vec!["SPY".to_string()];

        download_symbols(&FixedProvider, &cache, &symbols, start, end, false, &SilentProgress);
        let again = download_symbols(&FixedProvider, &cache, &symbols, start, end, false, &SilentProgress);
        assert_eq!(again.skipped, 1);
        let forced = download_symbols(&FixedProvider, &cache, &symbols, start, end, true, &SilentProgress);
        assert_eq!(forced.skipped, 0);
        assert_eq!(forced.succeeded, 1);
    }
}
