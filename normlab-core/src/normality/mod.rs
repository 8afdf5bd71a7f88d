//! Normality test battery.
//!
//! Four tests run on the same cleaned sample:
//! - Shapiro–Wilk (Royston's AS R94 approximation)
//! - Anderson–Darling, with a p-value interpolated from the critical-value
//!   table (an approximation, see [`anderson`])
//! - Jarque–Bera (asymptotic χ²(2))
//! - Kolmogorov–Smirnov against N(0,1) after standardizing with the
//!   population standard deviation
//!
//! Non-finite values are dropped first. Fewer than `min_observations`
//! remaining values is the degenerate case: every p-value is NaN and the
//! verdict is reject. Constant samples are not special-cased; whatever the
//! formulas produce (usually NaN) flows through, and NaN never accepts.

pub mod anderson;
pub mod jarque_bera;
pub mod kolmogorov;
pub mod moments;
pub mod shapiro;

use serde::{Deserialize, Serialize};
use statrs::function::erf;
use std::f64::consts::SQRT_2;

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default minimum number of valid observations.
pub const DEFAULT_MIN_OBSERVATIONS: usize = 8;

/// Battery policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// A test passes when its p-value is strictly greater than `alpha`.
    pub alpha: f64,
    /// Below this many finite observations the result is all-NaN.
    pub min_observations: usize,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        }
    }
}

impl BatteryConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// The tests whose p-values decide the verdict. This is the complete set;
/// sample size and statistics never take part in acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTest {
    ShapiroWilk,
    AndersonDarling,
    JarqueBera,
    KolmogorovSmirnov,
}

impl NormalityTest {
    pub const ALL: [NormalityTest; 4] = [
        NormalityTest::ShapiroWilk,
        NormalityTest::AndersonDarling,
        NormalityTest::JarqueBera,
        NormalityTest::KolmogorovSmirnov,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NormalityTest::ShapiroWilk => "shapiro",
            NormalityTest::AndersonDarling => "anderson",
            NormalityTest::JarqueBera => "jarque_bera",
            NormalityTest::KolmogorovSmirnov => "ks",
        }
    }
}

impl std::fmt::Display for NormalityTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Statistic and p-value of a single test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestOutcome {
    pub const UNDEFINED: TestOutcome = TestOutcome {
        statistic: f64::NAN,
        p_value: f64::NAN,
    };
}

/// One value per test in the battery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerTest {
    pub shapiro: f64,
    pub anderson: f64,
    pub jarque_bera: f64,
    pub ks: f64,
}

impl PerTest {
    pub const NAN: PerTest = PerTest {
        shapiro: f64::NAN,
        anderson: f64::NAN,
        jarque_bera: f64::NAN,
        ks: f64::NAN,
    };

    pub fn get(&self, test: NormalityTest) -> f64 {
        match test {
            NormalityTest::ShapiroWilk => self.shapiro,
            NormalityTest::AndersonDarling => self.anderson,
            NormalityTest::JarqueBera => self.jarque_bera,
            NormalityTest::KolmogorovSmirnov => self.ks,
        }
    }

    /// `(test, value)` pairs in battery order.
    pub fn iter(&self) -> impl Iterator<Item = (NormalityTest, f64)> + '_ {
        NormalityTest::ALL.iter().map(move |&t| (t, self.get(t)))
    }
}

/// Outcome of running the battery on one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityResult {
    pub p_values: PerTest,
    /// W, A², JB and D respectively.
    pub statistics: PerTest,
    /// Finite observations actually tested.
    pub n: usize,
    pub accept: bool,
    /// Fewer than `min_observations` finite values: nothing was tested.
    /// A constant sample that was tested is not degenerate, even when its
    /// statistics come out NaN.
    pub degenerate: bool,
}

impl NormalityResult {
    /// All-NaN result for a sample too small to test.
    pub fn degenerate(n: usize) -> Self {
        Self {
            p_values: PerTest::NAN,
            statistics: PerTest::NAN,
            n,
            accept: false,
            degenerate: true,
        }
    }

    fn tested(p_values: PerTest, statistics: PerTest, n: usize, alpha: f64) -> Self {
        Self {
            p_values,
            statistics,
            n,
            accept: accepts(&p_values, alpha),
            degenerate: false,
        }
    }

    /// True when the sample fell below the minimum size.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Tests whose p-value is at or below `alpha` (or NaN).
    pub fn rejections(&self, alpha: f64) -> Vec<NormalityTest> {
        self.p_values
            .iter()
            .filter(|&(_, p)| p.is_nan() || p <= alpha)
            .map(|(t, _)| t)
            .collect()
    }
}

/// Acceptance rule: every p-value in the explicit set strictly exceeds
/// `alpha`. NaN compares false, so any NaN rejects.
pub fn accepts(p_values: &PerTest, alpha: f64) -> bool {
    p_values.iter().all(|(_, p)| p > alpha)
}

/// Finite values of `sample`, in their original order.
pub fn clean_sample(sample: &[f64]) -> Vec<f64> {
    sample.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Run all four tests on `sample`.
pub fn run_battery(sample: &[f64], config: &BatteryConfig) -> NormalityResult {
    let clean = clean_sample(sample);
    let n = clean.len();
    if n < config.min_observations {
        return NormalityResult::degenerate(n);
    }

    let sw = shapiro::shapiro_wilk(&clean);
    let ad = anderson::anderson_darling(&clean);
    let jb = jarque_bera::jarque_bera(&clean);
    let ks = kolmogorov::kolmogorov_smirnov(&clean);

    let p_values = PerTest {
        shapiro: sw.p_value,
        anderson: ad.approximate_p_value(),
        jarque_bera: jb.p_value,
        ks: ks.p_value,
    };
    let statistics = PerTest {
        shapiro: sw.statistic,
        anderson: ad.statistic,
        jarque_bera: jb.statistic,
        ks: ks.statistic,
    };
    NormalityResult::tested(p_values, statistics, n, config.alpha)
}

// ── Standard normal helpers ──────────────────────────────────────────

/// Φ(x).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * erf::erfc(-x / SQRT_2)
}

/// 1 − Φ(x), accurate in the upper tail.
pub(crate) fn norm_sf(x: f64) -> f64 {
    0.5 * erf::erfc(x / SQRT_2)
}

/// Φ⁻¹(p) for p in (0, 1).
pub(crate) fn norm_ppf(p: f64) -> f64 {
    -SQRT_2 * erf::erfc_inv(2.0 * p)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, roughly normal sample: Φ⁻¹ at evenly spaced quantiles.
    fn normal_scores(n: usize) -> Vec<f64> {
        (1..=n).map(|i| norm_ppf(i as f64 / (n as f64 + 1.0))).collect()
    }

    #[test]
    fn normal_helpers_are_consistent() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((norm_cdf(1.959963984540054) - 0.975).abs() < 1e-9);
        assert!((norm_sf(1.959963984540054) - 0.025).abs() < 1e-9);
        assert!((norm_ppf(0.975) - 1.959963984540054).abs() < 1e-9);
    }

    #[test]
    fn small_sample_is_all_nan() {
        let r = run_battery(&[0.01, -0.02, 0.03], &BatteryConfig::default());
        assert_eq!(r.n, 3);
        assert!(!r.accept);
        assert!(r.is_degenerate());
        for (_, p) in r.p_values.iter() {
            assert!(p.is_nan());
        }
    }

    #[test]
    fn nan_values_are_dropped_before_counting() {
        let mut sample = normal_scores(7);
        sample.push(f64::NAN);
        sample.push(f64::INFINITY);
        let r = run_battery(&sample, &BatteryConfig::default());
        assert_eq!(r.n, 7);
        assert!(r.is_degenerate());
    }

    #[test]
    fn normal_scores_are_accepted() {
        let r = run_battery(&normal_scores(200), &BatteryConfig::default());
        assert_eq!(r.n, 200);
        assert!(r.accept, "p-values: {:?}", r.p_values);
        for (test, p) in r.p_values.iter() {
            assert!((0.0..=1.0).contains(&p), "{test} p-value out of range: {p}");
        }
    }

    #[test]
    fn exponential_scores_are_rejected() {
        let sample: Vec<f64> = (1..=300)
            .map(|i| -(1.0 - i as f64 / 301.0).ln())
            .collect();
        let r = run_battery(&sample, &BatteryConfig::default());
        assert!(!r.accept);
        let rejected = r.rejections(DEFAULT_ALPHA);
        assert!(rejected.contains(&NormalityTest::ShapiroWilk));
        assert!(rejected.contains(&NormalityTest::JarqueBera));
    }

    #[test]
    fn constant_sample_never_accepts() {
        let r = run_battery(&[0.001; 50], &BatteryConfig::default());
        assert_eq!(r.n, 50);
        assert!(!r.accept);
    }

    #[test]
    fn constant_sample_is_not_degenerate() {
        // Stale prices give a flat window of zero returns: tested, then rejected.
        let r = run_battery(&[0.0; 252], &BatteryConfig::default());
        assert_eq!(r.n, 252);
        assert!(!r.is_degenerate());
        assert!(!r.accept);
        assert!(!r.rejections(DEFAULT_ALPHA).is_empty());
    }

    #[test]
    fn acceptance_uses_strict_inequality() {
        let p = PerTest {
            shapiro: 0.5,
            anderson: 0.15,
            jarque_bera: 0.05,
            ks: 0.9,
        };
        assert!(!accepts(&p, 0.05));
        assert!(accepts(&p, 0.049));
    }

    #[test]
    fn acceptance_rejects_any_nan() {
        let p = PerTest {
            shapiro: 0.5,
            anderson: f64::NAN,
            jarque_bera: 0.5,
            ks: 0.5,
        };
        assert!(!accepts(&p, 0.05));
    }

    #[test]
    fn alpha_is_configurable() {
        let sample = normal_scores(100);
        let strict = BatteryConfig::default().with_alpha(0.999);
        assert!(!run_battery(&sample, &strict).accept);
    }

    #[test]
    fn min_observations_is_configurable() {
        let cfg = BatteryConfig {
            alpha: DEFAULT_ALPHA,
            min_observations: 20,
        };
        let r = run_battery(&normal_scores(15), &cfg);
        assert!(r.is_degenerate());
        assert_eq!(r.n, 15);
    }

    #[test]
    fn test_names_are_stable() {
        let names: Vec<&str> = NormalityTest::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["shapiro", "anderson", "jarque_bera", "ks"]);
    }
}
