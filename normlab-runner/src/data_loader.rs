//! Price loading for studies.
//!
//! For each symbol, in order:
//! 1. Parquet cache (unless `force`)
//! 2. Download through the provider, then cache (unless `offline`)
//! 3. Synthetic geometric random walk, tagged, when `synthetic` is set
//! 4. Otherwise a [`LoadError`]
//!
//! Bars are restricted to `[start, end]`, cleaned and aligned on the union
//! of their dates.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use thiserror::Error;

use normlab_core::data::{
    align_series, download_one, to_price_series, CoverageResult, DataError, DataSource, DownloadProgress,
    ParquetCache, PriceProvider, RawBar,
};
use normlab_core::PriceTable;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and network access is off (use --synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("no prices for '{symbol}' between {start} and {end}")]
    EmptyRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never touch the network.
    pub offline: bool,
    /// Fall back to synthetic prices when nothing real is available.
    pub synthetic: bool,
    /// Re-download even when cached.
    pub force: bool,
}

/// Aligned prices plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    /// Columns in the requested symbol order.
    pub table: PriceTable,
    pub sources: BTreeMap<String, DataSource>,
    /// BLAKE3 over dates and prices of every column.
    pub dataset_hash: String,
    pub synthetic: bool,
}

pub fn load_prices(
    symbols: &[String],
    cache: &ParquetCache,
    provider: Option<&dyn PriceProvider>,
    progress: Option<&dyn DownloadProgress>,
    opts: &LoadOptions,
) -> Result<LoadedPrices, LoadError> {
    let total = symbols.len();
    let mut series = Vec::with_capacity(total);
    let mut sources = BTreeMap::new();
    let mut synthetic = false;

    for (i, symbol) in symbols.iter().enumerate() {
        if let Some(p) = progress {
            p.on_start(symbol, i, total);
        }

        let (bars, source) = match resolve_bars(symbol, cache, provider, opts) {
            Ok(Some(found)) => found,
            Ok(None) if opts.synthetic => {
                tracing::warn!(symbol = %symbol, "generating synthetic prices; results are tagged synthetic");
                synthetic = true;
                (synthetic_bars(symbol, opts.start, opts.end), DataSource::Synthetic)
            }
            Ok(None) if opts.offline => {
                return Err(LoadError::NoCachedDataOffline {
                    symbol: symbol.clone(),
                })
            }
            Ok(None) => {
                return Err(LoadError::DownloadFailed {
                    symbol: symbol.clone(),
                    reason: "no price provider available".into(),
                })
            }
            Err(e) if opts.synthetic => {
                tracing::warn!(symbol = %symbol, error = %e, "download failed, generating synthetic prices");
                synthetic = true;
                (synthetic_bars(symbol, opts.start, opts.end), DataSource::Synthetic)
            }
            Err(e) => {
                if let Some(p) = progress {
                    p.on_complete(symbol, i, total, &Err(DataError::Other(e.to_string())));
                }
                return Err(e);
            }
        };

        let in_range: Vec<RawBar> = bars
            .into_iter()
            .filter(|b| b.date >= opts.start && b.date <= opts.end)
            .collect();
        if in_range.is_empty() {
            return Err(LoadError::EmptyRange {
                symbol: symbol.clone(),
                start: opts.start,
                end: opts.end,
            });
        }

        let (prices, _) = to_price_series(symbol, in_range);
        tracing::debug!(symbol = %symbol, rows = prices.len(), %source, "prices loaded");
        if let Some(p) = progress {
            p.on_complete(symbol, i, total, &Ok(()));
        }
        series.push(prices);
        sources.insert(symbol.clone(), source);
    }

    let table = align_series(&series);
    let dataset_hash = dataset_hash(&table);

    if let Some(p) = progress {
        p.on_batch_complete(sources.len(), total - sources.len(), total);
    }

    Ok(LoadedPrices {
        table,
        sources,
        dataset_hash,
        synthetic,
    })
}

/// Cache, then download. `Ok(None)` means nothing real is reachable.
///
/// A cache that only partly covers `[start, end]` is refreshed when a
/// provider is reachable. Otherwise the shorter cached history is used with
/// a warning.
fn resolve_bars(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<Option<(Vec<RawBar>, DataSource)>, LoadError> {
    let provider = if opts.offline {
        None
    } else {
        provider.filter(|p| p.is_available())
    };

    let mut stale = None;
    if !opts.force {
        match cache.load(symbol) {
            Ok(bars) => match cache.covers_range(symbol, opts.start, opts.end) {
                CoverageResult::PartiallyCovered {
                    cached_start,
                    cached_end,
                } => {
                    if provider.is_none() {
                        tracing::warn!(
                            symbol,
                            %cached_start,
                            %cached_end,
                            requested_start = %opts.start,
                            requested_end = %opts.end,
                            "cache only partly covers the requested range, using cached history"
                        );
                        return Ok(Some((bars, DataSource::Cache)));
                    }
                    tracing::debug!(symbol, %cached_start, %cached_end, "cache partly covers range, refreshing");
                    stale = Some(bars);
                }
                _ => {
                    tracing::debug!(symbol, bars = bars.len(), "cache hit");
                    return Ok(Some((bars, DataSource::Cache)));
                }
            },
            Err(e) => tracing::debug!(symbol, reason = %e, "cache miss"),
        }
    }

    let Some(provider) = provider else {
        return Ok(None);
    };

    match download_one(provider, cache, symbol, opts.start, opts.end) {
        Ok(()) => {
            let bars = cache.load(symbol)?;
            Ok(Some((bars, DataSource::YahooFinance)))
        }
        Err(e) => match stale {
            Some(bars) => {
                tracing::warn!(symbol, error = %e, "refresh failed, using partly covering cache");
                Ok(Some((bars, DataSource::Cache)))
            }
            None => Err(LoadError::DownloadFailed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }),
        },
    }
}

/// Deterministic hash of an aligned price table.
fn dataset_hash(table: &PriceTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in &table.dates {
        hasher.update(date.to_string().as_bytes());
    }
    for (asset, column) in table.assets.iter().zip(&table.columns) {
        hasher.update(asset.as_bytes());
        for price in column {
            hasher.update(&price.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Daily log-return volatility of synthetic prices (about 16% a year).
const SYNTHETIC_VOLATILITY: f64 = 0.01;
const SYNTHETIC_DRIFT: f64 = 0.0002;
const SYNTHETIC_START_PRICE: f64 = 100.0;

/// Geometric random walk on weekdays, seeded from the symbol name.
///
/// Log-returns are i.i.d. normal, so synthetic studies have a known answer.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = SYNTHETIC_START_PRICE;
    let mut day = start;
    while day <= end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            bars.push(RawBar::close_only(day, price));
            let z: f64 = rng.sample(StandardNormal);
            price *= (SYNTHETIC_DRIFT + SYNTHETIC_VOLATILITY * z).exp();
        }
        day += Duration::days(1);
    }
    bars
}
