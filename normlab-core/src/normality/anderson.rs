//! Anderson–Darling test for normality with estimated mean and variance.
//!
//! The statistic has no closed-form null distribution here. Instead a small
//! table of critical values (Stephens' case 3, adjusted for sample size) is
//! reported, and a p-value is approximated by linear interpolation over that
//! table. Outside the tabulated range the p-value is clamped to the nearest
//! level, so it only ever lies in `[0.01, 0.15]`.

use super::moments::{mean, sample_std};
use super::{norm_cdf, norm_sf};

/// Significance levels (as fractions) matching [`BASE_CRITICAL_VALUES`].
pub const SIGNIFICANCE_LEVELS: [f64; 5] = [0.15, 0.10, 0.05, 0.025, 0.01];

/// Case-3 critical values before the small-sample adjustment.
const BASE_CRITICAL_VALUES: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

#[derive(Debug, Clone, PartialEq)]
pub struct AndersonDarling {
    /// A².
    pub statistic: f64,
    /// Critical values in ascending order, one per significance level.
    pub critical_values: [f64; 5],
    /// Significance levels as fractions, descending.
    pub significance: [f64; 5],
}

impl AndersonDarling {
    /// P-value read off the critical-value table.
    ///
    /// Critical values ascend while significance descends; the statistic is
    /// placed on that curve and interpolated linearly. Statistics below the
    /// first critical value give 0.15, above the last give 0.01. NaN in, NaN
    /// out.
    pub fn approximate_p_value(&self) -> f64 {
        interpolate(self.statistic, &self.critical_values, &self.significance)
    }
}

/// Critical values for a sample of `n`, rounded to three decimals like the
/// published table.
pub fn critical_values(n: usize) -> [f64; 5] {
    let nf = n as f64;
    let adj = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    BASE_CRITICAL_VALUES.map(|c| (c / adj * 1000.0).round() / 1000.0)
}

/// Run the test. Fewer than 2 observations gives a NaN statistic.
pub fn anderson_darling(sample: &[f64]) -> AndersonDarling {
    let n = sample.len();
    let statistic = if n < 2 {
        f64::NAN
    } else {
        statistic(sample)
    };
    AndersonDarling {
        statistic,
        critical_values: critical_values(n.max(1)),
        significance: SIGNIFICANCE_LEVELS,
    }
}

fn statistic(sample: &[f64]) -> f64 {
    let n = sample.len();
    let m = mean(sample);
    let s = sample_std(sample);

    let mut z: Vec<f64> = sample.iter().map(|x| (x - m) / s).collect();
    z.sort_by(f64::total_cmp);

    let nf = n as f64;
    let sum: f64 = (0..n)
        .map(|i| {
            let weight = (2 * i + 1) as f64;
            weight * (norm_cdf(z[i]).ln() + norm_sf(z[n - 1 - i]).ln())
        })
        .sum();
    -nf - sum / nf
}

/// Piecewise-linear interpolation of `ys` over ascending `xs`, clamped to the
/// end values.
fn interpolate(x: f64, xs: &[f64; 5], ys: &[f64; 5]) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[4] {
        return ys[4];
    }
    let k = xs.iter().position(|&c| c > x).unwrap_or(4);
    let (x0, x1) = (xs[k - 1], xs[k]);
    let (y0, y1) = (ys[k - 1], ys[k]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
