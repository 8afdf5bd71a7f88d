//! Multi-asset tables aligned on a common date axis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::{PriceSeries, ReturnSeries};

/// Column-oriented table: one shared date axis, one `f64` column per asset.
///
/// Every column has the same length as `dates`. Assets keep the order in
/// which they were added, which is the order results are reported in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedTable {
    pub dates: Vec<NaiveDate>,
    pub assets: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

/// Aligned closing prices (NaN where an asset did not trade).
pub type PriceTable = AlignedTable;

/// Aligned log-returns (NaN where a return is undefined).
pub type ReturnTable = AlignedTable;

impl AlignedTable {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            assets: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Append a column. Panics in debug builds if the length is off.
    pub fn push_column(&mut self, asset: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.dates.len());
        self.assets.push(asset.into());
        self.columns.push(values);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    pub fn column(&self, asset: &str) -> Option<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Extract one asset as a return series on the table's axis.
    pub fn series(&self, asset: &str) -> Option<ReturnSeries> {
        self.column(asset)
            .map(|values| ReturnSeries::new(asset, self.dates.clone(), values.to_vec()))
    }

    /// Extract one asset as a price series on the table's axis.
    pub fn price_series(&self, asset: &str) -> Option<PriceSeries> {
        self.column(asset)
            .map(|values| PriceSeries::new(asset, self.dates.clone(), values.to_vec()))
    }

    /// All assets as return series, in table order.
    pub fn all_series(&self) -> Vec<ReturnSeries> {
        self.assets
            .iter()
            .zip(&self.columns)
            .map(|(asset, values)| ReturnSeries::new(asset.clone(), self.dates.clone(), values.clone()))
            .collect()
    }

    /// Keep only the rows whose index satisfies `keep`.
    pub fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        let kept: Vec<usize> = (0..self.dates.len()).filter(|&i| keep(i)).collect();
        self.dates = kept.iter().map(|&i| self.dates[i]).collect();
        for column in &mut self.columns {
            *column = kept.iter().map(|&i| column[i]).collect();
        }
    }
}
