//! Battery behaviour on reference inputs and under the null hypothesis.
//!
//! Covers:
//! 1. The four-price example from end to end (too few returns to test)
//! 2. Reference statistics on fixed samples
//! 3. Repeated-trial p-value calibration with seeded i.i.d. normal draws
//! 4. Heavy-tailed and skewed returns are rejected

use normlab_core::normality::{
    kolmogorov, run_battery, BatteryConfig, NormalityTest, DEFAULT_ALPHA,
};
use normlab_core::returns::log_returns;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{StandardNormal, StudentT};

// ── Helpers ──────────────────────────────────────────────────────────

fn normal_draws(rng: &mut StdRng, n: usize) -> Vec<f64> {
    rng.sample_iter(StandardNormal).take(n).collect()
}

/// Student-t with 3 degrees of freedom: finite variance, very fat tails.
fn heavy_tailed_draws(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let t = StudentT::new(3.0).unwrap();
    rng.sample_iter(t).take(n).collect()
}

// ── 1. End-to-end example ────────────────────────────────────────────

#[test]
fn four_prices_give_three_returns_and_no_verdict() {
    let r = log_returns(&[100.0, 101.0, 99.0, 102.0]);
    assert_eq!(r.len(), 3);
    assert!((r[0] - 1.01f64.ln()).abs() < 1e-12);
    assert!((r[1] - (99.0f64 / 101.0).ln()).abs() < 1e-12);
    assert!((r[2] - (102.0f64 / 99.0).ln()).abs() < 1e-12);

    let result = run_battery(&r, &BatteryConfig::default());
    assert_eq!(result.n, 3);
    assert!(!result.accept);
    for (_, p) in result.p_values.iter() {
        assert!(p.is_nan());
    }
}

#[test]
fn exactly_min_observations_is_tested() {
    let sample = [-1.2, -0.6, -0.3, 0.0, 0.1, 0.4, 0.7, 1.1];
    let result = run_battery(&sample, &BatteryConfig::default());
    assert_eq!(result.n, 8);
    for (test, p) in result.p_values.iter() {
        assert!(!p.is_nan(), "{test} should be defined at n = 8");
    }
}

// ── 2. Reference statistics ──────────────────────────────────────────

#[test]
fn uniform_grid_statistics() {
    // 1..=20 is flat: JB from S = 0 and K = -1.2 (biased, ≈ -1.206).
    let xs: Vec<f64> = (1..=20).map(f64::from).collect();
    let r = run_battery(&xs, &BatteryConfig::default());

    let k: f64 = {
        let m = 10.5;
        let m2 = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 20.0;
        let m4 = xs.iter().map(|x| (x - m).powi(4)).sum::<f64>() / 20.0;
        m4 / (m2 * m2) - 3.0
    };
    let jb = 20.0 / 6.0 * (k * k / 4.0);
    assert!((r.statistics.jarque_bera - jb).abs() < 1e-10);
    assert!((r.p_values.jarque_bera - (-jb / 2.0).exp()).abs() < 1e-10);

    // Light tails pull W below 1 without making it small.
    assert!(r.statistics.shapiro < 0.99 && r.statistics.shapiro > 0.9);
}

#[test]
fn ks_distance_of_known_points() {
    // Φ(0) = 0.5; one point at 0 gives D = 0.5.
    assert!((kolmogorov::distance_to_standard_normal(&[0.0]) - 0.5).abs() < 1e-15);
    // Two symmetric points at ±Φ⁻¹(0.75): ECDF steps 0.5/1 vs Φ 0.25/0.75.
    let q = 0.674_489_750_196_081_7;
    let d = kolmogorov::distance_to_standard_normal(&[-q, q]);
    assert!((d - 0.25).abs() < 1e-9);
}

// ── 3. Calibration under the null ────────────────────────────────────

#[test]
fn shapiro_p_values_are_uniform_under_normality() {
    let mut rng = StdRng::seed_from_u64(42);
    let trials = 200;
    let mean_p: f64 = (0..trials)
        .map(|_| run_battery(&normal_draws(&mut rng, 500), &BatteryConfig::default()).p_values.shapiro)
        .sum::<f64>()
        / trials as f64;
    assert!((mean_p - 0.5).abs() < 0.08, "mean Shapiro p = {mean_p}");
}

#[test]
fn ks_p_values_are_uniform_for_known_parameters() {
    let mut rng = StdRng::seed_from_u64(7);
    let trials = 200;
    let n = 500;
    let mean_p: f64 = (0..trials)
        .map(|_| {
            let d = kolmogorov::distance_to_standard_normal(&normal_draws(&mut rng, n));
            kolmogorov::two_sided_p_value(d, n)
        })
        .sum::<f64>()
        / trials as f64;
    assert!((mean_p - 0.5).abs() < 0.08, "mean KS p = {mean_p}");
}

#[test]
fn battery_ks_is_conservative_with_estimated_parameters() {
    let mut rng = StdRng::seed_from_u64(11);
    let trials = 100;
    let mean_p: f64 = (0..trials)
        .map(|_| run_battery(&normal_draws(&mut rng, 500), &BatteryConfig::default()).p_values.ks)
        .sum::<f64>()
        / trials as f64;
    assert!(mean_p > 0.5, "mean battery KS p = {mean_p}");
}

#[test]
fn most_normal_samples_are_accepted() {
    let mut rng = StdRng::seed_from_u64(2024);
    let trials = 100;
    let accepted = (0..trials)
        .filter(|_| run_battery(&normal_draws(&mut rng, 300), &BatteryConfig::default()).accept)
        .count();
    // Four tests at 5% each, partly dependent: expect roughly 85% acceptance.
    assert!(accepted >= 70, "accepted {accepted}/{trials}");
}

// ── 4. Rejection power ───────────────────────────────────────────────

#[test]
fn heavy_tails_are_rejected() {
    let mut rng = StdRng::seed_from_u64(99);
    let sample = heavy_tailed_draws(&mut rng, 1_000);
    let r = run_battery(&sample, &BatteryConfig::default());
    assert!(!r.accept);
    let rejected = r.rejections(DEFAULT_ALPHA);
    assert!(rejected.contains(&NormalityTest::JarqueBera));
    assert!(rejected.contains(&NormalityTest::ShapiroWilk));
}

#[test]
fn lognormal_levels_are_rejected() {
    let mut rng = StdRng::seed_from_u64(5);
    let sample: Vec<f64> = normal_draws(&mut rng, 400).into_iter().map(f64::exp).collect();
    let r = run_battery(&sample, &BatteryConfig::default());
    assert!(!r.accept);
    assert!(r.p_values.anderson <= 0.01 + 1e-12);
    assert!(r.p_values.ks < 0.05);
}
