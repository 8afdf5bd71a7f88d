//! Jarque–Bera test: `JB = n/6 · (S² + K²/4)` with biased skewness `S` and
//! excess kurtosis `K`, compared against χ²(2).

use super::moments::{excess_kurtosis, skewness};
use super::TestOutcome;
use statrs::distribution::{ChiSquared, ContinuousCDF};

pub fn jarque_bera(sample: &[f64]) -> TestOutcome {
    let n = sample.len();
    if n < 2 {
        return TestOutcome::UNDEFINED;
    }
    let s = skewness(sample);
    let k = excess_kurtosis(sample);
    let statistic = n as f64 / 6.0 * (s * s + k * k / 4.0);
    TestOutcome {
        statistic,
        p_value: chi2_sf(statistic, 2.0),
    }
}

fn chi2_sf(x: f64, dof: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    match ChiSquared::new(dof) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}
