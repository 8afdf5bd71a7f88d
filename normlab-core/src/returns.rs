//! Log-return transform.
//!
//! `r[t] = ln(p[t]) - ln(p[t-1])`. The first date produces no return. A
//! missing or non-positive price makes the neighbouring returns NaN; nothing
//! is forward-filled.

use crate::domain::{PriceSeries, PriceTable, ReturnSeries, ReturnTable};

/// Log-returns of a plain price slice. Output length is `prices.len() - 1`
/// (empty for fewer than two prices).
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1].ln() - w[0].ln()).collect()
}

/// Log-returns of a single price series, dated at the later of each pair.
pub fn series_returns(prices: &PriceSeries) -> ReturnSeries {
    let dates = prices.dates.iter().skip(1).copied().collect();
    ReturnSeries::new(prices.asset.clone(), dates, log_returns(&prices.prices))
}

/// Log-returns of an aligned price table.
///
/// Rows where every asset's return is NaN are dropped (this always removes
/// the leading edge where no asset has history yet). Rows missing for only
/// some assets keep NaN for those assets.
pub fn table_returns(prices: &PriceTable) -> ReturnTable {
    let dates = prices.dates.iter().skip(1).copied().collect();
    let mut returns = ReturnTable::new(dates);
    for (asset, column) in prices.assets.iter().zip(&prices.columns) {
        returns.push_column(asset.clone(), log_returns(column));
    }

    let columns = returns.columns.clone();
    returns.retain_rows(|i| columns.iter().any(|c| !c[i].is_nan()));
    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn returns_match_log_ratios() {
        let r = log_returns(&[100.0, 101.0, 99.0, 102.0]);
        assert_eq!(r.len(), 3);
        assert!((r[0] - (1.01f64).ln()).abs() < 1e-12);
        assert!((r[1] - (99.0f64 / 101.0).ln()).abs() < 1e-12);
        assert!((r[2] - (102.0f64 / 99.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn short_inputs_produce_no_returns() {
        assert!(log_returns(&[]).is_empty());
        assert!(log_returns(&[100.0]).is_empty());
    }

    #[test]
    fn missing_price_poisons_adjacent_returns() {
        let r = log_returns(&[100.0, f64::NAN, 102.0, 103.0]);
        assert!(r[0].is_nan());
        assert!(r[1].is_nan());
        assert!(r[2].is_finite());
    }

    #[test]
    fn non_positive_price_is_nan() {
        let r = log_returns(&[100.0, -5.0]);
        assert!(r[0].is_nan());
    }

    #[test]
    fn series_returns_drop_first_date() {
        let p = PriceSeries::new("SPY", vec![d(2), d(3), d(4)], vec![100.0, 110.0, 121.0]);
        let r = series_returns(&p);
        assert_eq!(r.dates, vec![d(3), d(4)]);
        assert!((r.values[0] - 1.1f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn table_drops_rows_missing_everywhere_only() {
        let mut prices = PriceTable::new(vec![d(2), d(3), d(4), d(5)]);
        // QQQ has a late start; both are missing on the 4th.
        prices.push_column("SPY", vec![100.0, 101.0, f64::NAN, 103.0]);
        prices.push_column("QQQ", vec![f64::NAN, 200.0, f64::NAN, 202.0]);

        let r = table_returns(&prices);
        // Returns dated 3rd, 4th, 5th. 3rd: SPY ok, QQQ NaN. 4th: both NaN -> dropped.
        // 5th: both NaN (previous price missing) -> dropped.
        assert_eq!(r.dates, vec![d(3)]);
        assert!(r.column("SPY").unwrap()[0].is_finite());
        assert!(r.column("QQQ").unwrap()[0].is_nan());
    }

    #[test]
    fn table_with_single_row_is_empty() {
        let mut prices = PriceTable::new(vec![d(2)]);
        prices.push_column("SPY", vec![100.0]);
        let r = table_returns(&prices);
        assert!(r.is_empty());
        assert_eq!(r.assets, vec!["SPY"]);
    }
}
