//! Price and return series on a trading-date axis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing prices for a single asset, ascending by date with no duplicates.
///
/// Missing observations are stored as NaN so the series can sit on a shared
/// timeline with other assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub asset: String,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(asset: impl Into<String>, dates: Vec<NaiveDate>, prices: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), prices.len());
        Self {
            asset: asset.into(),
            dates,
            prices,
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Log-returns for a single asset. NaN marks a missing observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub asset: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(asset: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            asset: asset.into(),
            dates,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of finite observations.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Same asset and dates, new values. Used by transforms that keep the axis.
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Self::new(self.asset.clone(), self.dates.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn valid_count_skips_nan() {
        let s = ReturnSeries::new("SPY", vec![d(2), d(3), d(4)], vec![0.01, f64::NAN, -0.02]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.valid_count(), 2);
    }

    #[test]
    fn with_values_keeps_axis() {
        let s = ReturnSeries::new("SPY", vec![d(2), d(3)], vec![0.01, 0.02]);
        let t = s.with_values(vec![0.0, 0.0]);
        assert_eq!(t.asset, "SPY");
        assert_eq!(t.dates, s.dates);
        assert_eq!(t.values, vec![0.0, 0.0]);
    }

    #[test]
    fn price_series_bounds() {
        let p = PriceSeries::new("QQQ", vec![d(2), d(5)], vec![100.0, 101.0]);
        assert_eq!(p.first_date(), Some(d(2)));
        assert_eq!(p.last_date(), Some(d(5)));
        assert!(!p.is_empty());
    }
}
