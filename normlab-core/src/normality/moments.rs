//! Sample moments shared by the normality tests.
//!
//! All functions assume a non-empty, NaN-free slice. Empty input yields NaN
//! through `0 / 0` rather than a panic.

pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// k-th central moment with divisor `n`.
pub fn central_moment(xs: &[f64], mean: f64, k: i32) -> f64 {
    xs.iter().map(|x| (x - mean).powi(k)).sum::<f64>() / xs.len() as f64
}

/// Standard deviation with divisor `n`.
pub fn population_std(xs: &[f64]) -> f64 {
    central_moment(xs, mean(xs), 2).sqrt()
}

/// Standard deviation with divisor `n - 1`.
pub fn sample_std(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (xs.len() as f64 - 1.0)).sqrt()
}

/// Biased skewness `m3 / m2^1.5`.
pub fn skewness(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let m2 = central_moment(xs, m, 2);
    central_moment(xs, m, 3) / m2.powf(1.5)
}

/// Biased excess kurtosis `m4 / m2^2 - 3`.
pub fn excess_kurtosis(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let m2 = central_moment(xs, m, 2);
    central_moment(xs, m, 4) / (m2 * m2) - 3.0
}
