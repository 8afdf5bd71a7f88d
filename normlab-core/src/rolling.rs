//! Rolling-window normality scan.
//!
//! For a series of length `L` and window `W`, every end index `i` in
//! `W..L` tests the window `[i - W, i)` from scratch. A window is tagged
//! with the date of its last observation (`dates[i - 1]`) and with `i`
//! itself, so `end_index` is exclusive.
//!
//! Windows are independent, so the scan fans out over rayon. Collection
//! preserves order: results come back by asset (input order), then by
//! ascending window end.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{ReturnSeries, ReturnTable};
use crate::normality::{run_battery, BatteryConfig, NormalityResult};

/// One trading year.
pub const DEFAULT_WINDOW: usize = 252;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingConfig {
    pub window: usize,
    pub battery: BatteryConfig,
    /// Evaluate windows on the rayon pool. Output is identical either way.
    pub parallel: bool,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            battery: BatteryConfig::default(),
            parallel: true,
        }
    }
}

impl RollingConfig {
    pub fn new(window: usize, battery: BatteryConfig) -> Self {
        Self {
            window,
            battery,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Battery result for one window of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub asset: String,
    /// Date of the last observation inside the window.
    pub window_end: NaiveDate,
    /// Exclusive end index into the source series.
    pub end_index: usize,
    #[serde(flatten)]
    pub result: NormalityResult,
}

impl WindowResult {
    pub fn is_normal(&self) -> bool {
        self.result.accept
    }
}

/// Ordered results of a scan over one or more assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingResultSet {
    pub window: usize,
    pub results: Vec<WindowResult>,
}

impl RollingResultSet {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowResult> {
        self.results.iter()
    }

    /// Windows whose battery accepted normality.
    pub fn accepted(&self) -> impl Iterator<Item = &WindowResult> {
        self.results.iter().filter(|r| r.is_normal())
    }

    pub fn for_asset<'a>(&'a self, asset: &'a str) -> impl Iterator<Item = &'a WindowResult> + 'a {
        self.results.iter().filter(move |r| r.asset == asset)
    }

    /// Distinct assets in result order.
    pub fn assets(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for r in &self.results {
            if !out.contains(&r.asset.as_str()) {
                out.push(&r.asset);
            }
        }
        out
    }

    /// Share of windows accepted. NaN for an empty set.
    pub fn acceptance_rate(&self) -> f64 {
        if self.results.is_empty() {
            return f64::NAN;
        }
        self.accepted().count() as f64 / self.results.len() as f64
    }
}

/// Number of windows a series of `len` observations yields.
pub fn window_count(len: usize, window: usize) -> usize {
    if window == 0 {
        return 0;
    }
    len.saturating_sub(window)
}

fn evaluate(series: &ReturnSeries, end: usize, config: &RollingConfig) -> WindowResult {
    let start = end - config.window;
    WindowResult {
        asset: series.asset.clone(),
        window_end: series.dates[end - 1],
        end_index: end,
        result: run_battery(&series.values[start..end], &config.battery),
    }
}

/// Scan a single series. A zero-length window yields nothing.
pub fn scan_series(series: &ReturnSeries, config: &RollingConfig) -> Vec<WindowResult> {
    if window_count(series.len(), config.window) == 0 {
        return Vec::new();
    }
    let ends = config.window..series.len();
    if config.parallel {
        ends.into_par_iter()
            .map(|end| evaluate(series, end, config))
            .collect()
    } else {
        ends.map(|end| evaluate(series, end, config)).collect()
    }
}

/// Scan every asset of an aligned return table.
///
/// Parallelism spans the flattened (asset, window) pairs so a single long
/// asset does not serialize the scan.
pub fn scan_table(table: &ReturnTable, config: &RollingConfig) -> RollingResultSet {
    let series = table.all_series();
    let jobs: Vec<(usize, usize)> = series
        .iter()
        .enumerate()
        .flat_map(|(a, s)| {
            let first = if window_count(s.len(), config.window) == 0 {
                s.len()
            } else {
                config.window
            };
            (first..s.len()).map(move |end| (a, end))
        })
        .collect();

    let results = if config.parallel {
        jobs.par_iter()
            .map(|&(a, end)| evaluate(&series[a], end, config))
            .collect()
    } else {
        jobs.iter()
            .map(|&(a, end)| evaluate(&series[a], end, config))
            .collect()
    };

    RollingResultSet {
        window: config.window,
        results,
    }
}
