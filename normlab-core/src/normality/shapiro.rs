//! Shapiro–Wilk W test, Royston (1992, 1995) approximation (AS R94).
//!
//! Coefficients come from Blom's approximation to the expected normal order
//! statistics with polynomial corrections for the two extreme weights. The
//! p-value uses Royston's normalizing transforms of `ln(1 - W)`, one for
//! `n <= 11` and one for larger samples. `n = 3` uses the exact law.

use super::{norm_ppf, norm_sf, TestOutcome};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Shapiro–Wilk test on a finite sample. Fewer than 3 points is undefined.
pub fn shapiro_wilk(sample: &[f64]) -> TestOutcome {
    let n = sample.len();
    if n < 3 {
        return TestOutcome::UNDEFINED;
    }

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);

    if n == 3 {
        return exact_n3(&x);
    }

    let Some(a) = coefficients(n) else {
        return TestOutcome::UNDEFINED;
    };
    let w = statistic(&x, &a);
    TestOutcome {
        statistic: w,
        p_value: p_value(w, n),
    }
}

/// c[0] + c[1]·x + c[2]·x² + …
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Weights for the lower half of the order statistics (upper half mirrors).
fn coefficients(n: usize) -> Option<Vec<f64>> {
    let half = n / 2;
    let nf = n as f64;

    let m: Vec<f64> = (1..=half)
        .map(|i| norm_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut a = vec![0.0; half];

    let (corrected, fac_sq, one_minus) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        (
            2,
            summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1],
            1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2,
        )
    } else {
        (1, summ2 - 2.0 * m[0] * m[0], 1.0 - 2.0 * a1 * a1)
    };
    if fac_sq <= 0.0 || one_minus <= 0.0 {
        return None;
    }
    let fac = (fac_sq / one_minus).sqrt();

    a[0] = a1;
    for i in corrected..half {
        a[i] = -m[i] / fac;
    }
    Some(a)
}

/// W = (Σ aᵢ (x₍ₙ₊₁₋ᵢ₎ − x₍ᵢ₎))² / Σ (xᵢ − x̄)². NaN for zero spread.
fn statistic(sorted: &[f64], a: &[f64]) -> f64 {
    let n = sorted.len();
    let sa: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (sorted[n - 1 - i] - sorted[i]))
        .sum();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
    let w = (sa * sa) / ss;
    // Rounding can push W a hair above 1. `f64::min` would also swallow NaN.
    if w > 1.0 {
        1.0
    } else {
        w
    }
}

fn p_value(w: f64, n: usize) -> f64 {
    let nf = n as f64;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();

    let z = if n <= 11 {
        let gamma = poly(&G, nf);
        if y >= gamma {
            return 0.0;
        }
        let y = -(gamma - y).ln();
        let m = poly(&C3, nf);
        let s = poly(&C4, nf).exp();
        (y - m) / s
    } else {
        let ln_n = nf.ln();
        let m = poly(&C5, ln_n);
        let s = poly(&C6, ln_n).exp();
        (y - m) / s
    };
    norm_sf(z)
}

fn exact_n3(sorted: &[f64]) -> TestOutcome {
    let mean = sorted.iter().sum::<f64>() / 3.0;
    let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
    let b = FRAC_1_SQRT_2 * (sorted[2] - sorted[0]);
    let w = ((b * b) / ss).clamp(0.75, 1.0);
    let p = (6.0 / PI) * (w.sqrt().asin() - 0.75f64.sqrt().asin());
    TestOutcome {
        statistic: w,
        p_value: p.clamp(0.0, 1.0),
    }
}
