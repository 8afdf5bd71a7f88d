//! Two-sided winsorization.
//!
//! Values below the `f`-quantile are raised to it and values above the
//! `(1 - f)`-quantile are lowered to it. Quantiles are computed per series
//! from its finite values with linear interpolation between order
//! statistics (Hyndman–Fan type 7). Length and NaN positions are preserved.

use crate::domain::{ReturnSeries, ReturnTable};

/// Upper bound for the trim fraction; beyond it the bounds would cross.
pub const MAX_FRACTION: f64 = 0.5;

/// Default trim fraction used by studies.
pub const DEFAULT_FRACTION: f64 = 0.01;

/// Clamp `f` into `[0, 0.5]`. NaN is treated as no trimming.
pub fn clamp_fraction(f: f64) -> f64 {
    if f.is_nan() {
        0.0
    } else {
        f.clamp(0.0, MAX_FRACTION)
    }
}

/// Linear-interpolation quantile of the finite values in `values`.
/// NaN when there are none.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || q.is_nan() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q.clamp(0.0, 1.0))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Lower and upper winsorization bounds for fraction `f`.
pub fn bounds(values: &[f64], f: f64) -> (f64, f64) {
    let f = clamp_fraction(f);
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    sorted.sort_by(f64::total_cmp);
    (quantile_sorted(&sorted, f), quantile_sorted(&sorted, 1.0 - f))
}

/// Winsorize a slice. NaN entries stay NaN.
pub fn winsorize(values: &[f64], f: f64) -> Vec<f64> {
    let (lo, hi) = bounds(values, f);
    if lo.is_nan() {
        return values.to_vec();
    }
    values
        .iter()
        .map(|&v| if v.is_nan() { v } else { v.max(lo).min(hi) })
        .collect()
}

pub fn winsorize_series(series: &ReturnSeries, f: f64) -> ReturnSeries {
    series.with_values(winsorize(&series.values, f))
}

/// Winsorize every column independently.
pub fn winsorize_table(table: &ReturnTable, f: f64) -> ReturnTable {
    let mut out = ReturnTable::new(table.dates.clone());
    for (asset, column) in table.assets.iter().zip(&table.columns) {
        out.push_column(asset.clone(), winsorize(column, f));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&xs, 0.0), 1.0);
        assert_eq!(quantile(&xs, 1.0), 5.0);
        assert_eq!(quantile(&xs, 0.5), 3.0);
        assert!((quantile(&xs, 0.1) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn quantile_ignores_nan() {
        let xs = [f64::NAN, 1.0, 3.0, f64::NAN];
        assert_eq!(quantile(&xs, 0.5), 2.0);
        assert!(quantile(&[f64::NAN], 0.5).is_nan());
    }

    #[test]
    fn extremes_are_pulled_in() {
        let mut xs: Vec<f64> = (0..100).map(|i| i as f64).collect();
        xs[0] = -1000.0;
        xs[99] = 1000.0;
        let w = winsorize(&xs, 0.05);
        let (lo, hi) = bounds(&xs, 0.05);
        assert_eq!(w.len(), xs.len());
        assert_eq!(w[0], lo);
        assert_eq!(w[99], hi);
        assert_eq!(w[50], 50.0);
    }

    #[test]
    fn nan_positions_are_preserved() {
        let xs = [1.0, f64::NAN, 3.0, 100.0, -100.0, f64::NAN];
        let w = winsorize(&xs, 0.2);
        assert!(w[1].is_nan());
        assert!(w[5].is_nan());
        assert!(w.iter().filter(|v| !v.is_nan()).all(|v| v.abs() < 100.0));
    }

    #[test]
    fn zero_fraction_is_identity() {
        let xs = [3.0, -1.0, 2.0];
        assert_eq!(winsorize(&xs, 0.0), xs.to_vec());
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(clamp_fraction(-0.1), 0.0);
        assert_eq!(clamp_fraction(0.9), 0.5);
        assert_eq!(clamp_fraction(f64::NAN), 0.0);
        // At f = 0.5 every value collapses to the median.
        let w = winsorize(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.9);
        assert!(w.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn table_columns_are_independent() {
        use chrono::NaiveDate;
        let dates: Vec<NaiveDate> = (1..=5)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect();
        let mut t = ReturnTable::new(dates);
        t.push_column("A", vec![1.0, 2.0, 3.0, 4.0, 50.0]);
        t.push_column("B", vec![-50.0, 0.0, 0.0, 0.0, 0.0]);
        let w = winsorize_table(&t, 0.25);
        assert_eq!(w.column("A").unwrap()[4], 4.0);
        assert_eq!(w.column("B").unwrap()[0], 0.0);
        assert_eq!(w.assets, t.assets);
    }
}
