//! Weighted aggregation of aligned return columns into one portfolio series.
//!
//! `r_p[t] = Σ w[a] · r[a][t]` over the weighted assets. Weights are used as
//! given (no renormalization, negatives allowed). A NaN return in any
//! weighted asset makes the aggregate NaN at that date.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{ReturnSeries, ReturnTable};

/// Name given to the aggregated series.
pub const PORTFOLIO_ASSET: &str = "PORTFOLIO";

/// Asset → weight. Ordered so aggregation and reports are deterministic.
pub type Weights = BTreeMap<String, f64>;

#[derive(Debug, Error, PartialEq)]
pub enum PortfolioError {
    #[error("no portfolio weights given")]
    NoWeights,

    #[error("weight given for '{asset}', which is not in the return table")]
    UnknownAsset { asset: String },
}

/// `1/K` for each asset in the table.
pub fn equal_weights(table: &ReturnTable) -> Weights {
    let k = table.asset_count() as f64;
    table
        .assets
        .iter()
        .map(|a| (a.clone(), 1.0 / k))
        .collect()
}

/// Aggregate `table` with `weights`. Assets without a weight are ignored.
pub fn aggregate(table: &ReturnTable, weights: &Weights) -> Result<ReturnSeries, PortfolioError> {
    if weights.is_empty() {
        return Err(PortfolioError::NoWeights);
    }

    let mut weighted: Vec<(&[f64], f64)> = Vec::with_capacity(weights.len());
    for (asset, &w) in weights {
        let column = table
            .column(asset)
            .ok_or_else(|| PortfolioError::UnknownAsset {
                asset: asset.clone(),
            })?;
        weighted.push((column, w));
    }

    let values = (0..table.len())
        .map(|t| weighted.iter().map(|(col, w)| w * col[t]).sum())
        .collect();

    Ok(ReturnSeries::new(PORTFOLIO_ASSET, table.dates.clone(), values))
}

/// Equal-weight aggregate of every asset in the table.
pub fn aggregate_equal(table: &ReturnTable) -> Result<ReturnSeries, PortfolioError> {
    aggregate(table, &equal_weights(table))
}
