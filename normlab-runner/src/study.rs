//! Study orchestration: from aligned prices to a complete report.
//!
//! A study runs, per asset, the battery on the full sample and on the
//! winsorized sample, a rolling-window scan, and the battery on the
//! weighted portfolio (raw and winsorized). Nothing here does I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use normlab_core::data::DataSource;
use normlab_core::normality::{run_battery, BatteryConfig, NormalityResult};
use normlab_core::portfolio::{aggregate, equal_weights, PortfolioError, Weights};
use normlab_core::returns::table_returns;
use normlab_core::rolling::{scan_table, RollingResultSet};
use normlab_core::trim::winsorize;
use normlab_core::{PriceTable, ReturnTable};

use crate::config::{ConfigError, RunId, StudyConfig};
use crate::data_loader::LoadedPrices;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("ticker '{0}' has no loaded prices")]
    MissingAsset(String),
}

/// Full-sample and optionally winsorized battery for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBattery {
    pub asset: String,
    pub full: NormalityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed: Option<NormalityResult>,
}

/// Rolling-scan totals for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingSummary {
    pub asset: String,
    pub windows: usize,
    pub normal_windows: usize,
    /// Windows with too few valid observations to test.
    pub degenerate_windows: usize,
    /// NaN when the asset produced no windows.
    pub acceptance_rate: f64,
    pub first_normal_end: Option<NaiveDate>,
    pub last_normal_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub weights: Weights,
    /// True when no weights were configured.
    pub equal_weighted: bool,
    pub full: NormalityResult,
    pub trimmed: NormalityResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub run_id: RunId,
    pub config: StudyConfig,
    pub generated_at: DateTime<Utc>,
    pub dataset_hash: String,
    pub sources: BTreeMap<String, DataSource>,
    pub synthetic: bool,
    /// Rows of the aligned return table.
    pub observations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub assets: Vec<AssetBattery>,
    pub rolling: RollingResultSet,
    pub rolling_summaries: Vec<RollingSummary>,
    pub portfolio: PortfolioReport,
}

/// Battery per asset of `returns`, in table order.
///
/// With `trim = Some(f)` each column is also winsorized at `f` and tested
/// again.
pub fn battery_by_asset(
    returns: &ReturnTable,
    battery: &BatteryConfig,
    trim: Option<f64>,
    parallel: bool,
) -> Vec<AssetBattery> {
    let evaluate = |(asset, column): (&String, &Vec<f64>)| AssetBattery {
        asset: asset.clone(),
        full: run_battery(column, battery),
        trimmed: trim.map(|f| run_battery(&winsorize(column, f), battery)),
    };

    if parallel {
        returns.assets.par_iter().zip(returns.columns.par_iter()).map(evaluate).collect()
    } else {
        returns.assets.iter().zip(returns.columns.iter()).map(evaluate).collect()
    }
}

/// Per-asset totals of a rolling scan, in result order.
pub fn summarize_rolling(set: &RollingResultSet) -> Vec<RollingSummary> {
    set.assets()
        .into_iter()
        .map(|asset| {
            let mut summary = RollingSummary {
                asset: asset.to_string(),
                windows: 0,
                normal_windows: 0,
                degenerate_windows: 0,
                acceptance_rate: f64::NAN,
                first_normal_end: None,
                last_normal_end: None,
            };
            for w in set.for_asset(asset) {
                summary.windows += 1;
                if w.result.is_degenerate() {
                    summary.degenerate_windows += 1;
                }
                if w.is_normal() {
                    summary.normal_windows += 1;
                    summary.first_normal_end.get_or_insert(w.window_end);
                    summary.last_normal_end = Some(w.window_end);
                }
            }
            if summary.windows > 0 {
                summary.acceptance_rate = summary.normal_windows as f64 / summary.windows as f64;
            }
            summary
        })
        .collect()
}

/// Battery on the weighted portfolio of `returns`, raw and winsorized at
/// `trim_fraction`. `None` weights means equal weights.
pub fn portfolio_battery(
    returns: &ReturnTable,
    weights: Option<&Weights>,
    battery: &BatteryConfig,
    trim_fraction: f64,
) -> Result<PortfolioReport, PortfolioError> {
    let weights = match weights {
        Some(w) => w.clone(),
        None => equal_weights(returns),
    };
    let series = aggregate(returns, &weights)?;
    Ok(PortfolioReport {
        full: run_battery(&series.values, battery),
        trimmed: run_battery(&winsorize(&series.values, trim_fraction), battery),
        equal_weighted: weights_are_equal(&weights, returns),
        weights,
    })
}

fn weights_are_equal(weights: &Weights, returns: &ReturnTable) -> bool {
    weights.len() == returns.asset_count() && *weights == equal_weights(returns)
}

/// Columns of `prices` for `tickers`, in ticker order.
fn select_assets(prices: &PriceTable, tickers: &[String]) -> Result<PriceTable, StudyError> {
    let mut out = PriceTable::new(prices.dates.clone());
    for ticker in tickers {
        let column = prices
            .column(ticker)
            .ok_or_else(|| StudyError::MissingAsset(ticker.clone()))?;
        out.push_column(ticker.clone(), column.to_vec());
    }
    Ok(out)
}

/// Run the whole study on already-loaded prices.
pub fn run_study(config: &StudyConfig, prices: &LoadedPrices) -> Result<StudyReport, StudyError> {
    config.validate()?;
    let run_id = config.run_id();
    let battery = config.battery_config();
    let fraction = config.trim.fraction;

    let selected = select_assets(&prices.table, &config.data.tickers)?;
    let returns = table_returns(&selected);
    tracing::info!(
        run_id = %&run_id[..12],
        assets = returns.asset_count(),
        observations = returns.len(),
        "running study"
    );

    let assets = battery_by_asset(&returns, &battery, Some(fraction), config.rolling.parallel);

    let rolling = scan_table(&returns, &config.rolling_config());
    let rolling_summaries = summarize_rolling(&rolling);
    let degenerate: usize = rolling_summaries.iter().map(|s| s.degenerate_windows).sum();
    if degenerate > 0 {
        tracing::debug!(degenerate, "rolling windows with too few observations");
    }
    tracing::info!(
        windows = rolling.len(),
        acceptance_rate = rolling.acceptance_rate(),
        "rolling scan complete"
    );

    let portfolio = portfolio_battery(&returns, config.portfolio.weights.as_ref(), &battery, fraction)?;

    let sources = config
        .data
        .tickers
        .iter()
        .filter_map(|t| prices.sources.get(t).map(|s| (t.clone(), *s)))
        .collect();

    Ok(StudyReport {
        run_id,
        config: config.clone(),
        generated_at: Utc::now(),
        dataset_hash: prices.dataset_hash.clone(),
        sources,
        synthetic: prices.synthetic,
        observations: returns.len(),
        first_date: returns.dates.first().copied(),
        last_date: returns.dates.last().copied(),
        assets,
        rolling,
        rolling_summaries,
        portfolio,
    })
}
