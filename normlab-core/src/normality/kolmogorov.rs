//! One-sample Kolmogorov–Smirnov test against the standard normal.
//!
//! The sample is standardized with its own mean and population standard
//! deviation, then compared with N(0, 1). No Lilliefors correction is made
//! for the estimated parameters, so the test is conservative.
//!
//! Two-sided p-values use the exact distribution of Marsaglia, Tsang and Wang
//! (2003) when it is cheap and numerically useful, and the asymptotic
//! Kolmogorov series with Stephens' small-sample correction otherwise.

use super::moments::{mean, population_std};
use super::{norm_cdf, TestOutcome};

/// Largest matrix order used by the exact method.
const MAX_EXACT_ORDER: usize = 201;

/// Beyond `n·d²` of this the exact method adds nothing over the series.
const EXACT_ND2_LIMIT: f64 = 18.0;

const SCALE: f64 = 1e140;
const SCALE_EXP: i32 = 140;

pub fn kolmogorov_smirnov(sample: &[f64]) -> TestOutcome {
    let n = sample.len();
    if n == 0 {
        return TestOutcome::UNDEFINED;
    }
    let d = statistic(sample);
    TestOutcome {
        statistic: d,
        p_value: two_sided_p_value(d, n),
    }
}

fn statistic(sample: &[f64]) -> f64 {
    let m = mean(sample);
    let s = population_std(sample);
    let z: Vec<f64> = sample.iter().map(|x| (x - m) / s).collect();
    distance_to_standard_normal(&z)
}

/// D = sup |F_n(z) − Φ(z)| for values already on the N(0, 1) scale.
pub fn distance_to_standard_normal(values: &[f64]) -> f64 {
    let mut z = values.to_vec();
    z.sort_by(f64::total_cmp);

    let nf = z.len() as f64;
    z.iter().enumerate().fold(0.0, |d: f64, (i, &zi)| {
        let cdf = norm_cdf(zi);
        let above = (i as f64 + 1.0) / nf - cdf;
        let below = cdf - i as f64 / nf;
        // NaN-propagating max.
        if above.is_nan() || below.is_nan() || d.is_nan() {
            f64::NAN
        } else {
            d.max(above).max(below)
        }
    })
}

/// P(D_n ≥ d) under the null.
pub fn two_sided_p_value(d: f64, n: usize) -> f64 {
    if d.is_nan() || n == 0 {
        return f64::NAN;
    }
    let nf = n as f64;
    if d <= 0.5 / nf {
        return 1.0;
    }
    if d >= 1.0 {
        return 0.0;
    }

    let order = 2 * (nf * d).floor() as usize + 1;
    let p = if nf * d * d < EXACT_ND2_LIMIT && order <= MAX_EXACT_ORDER {
        1.0 - exact_cdf(n, d)
    } else {
        asymptotic_sf(d, nf)
    };
    p.clamp(0.0, 1.0)
}

/// Kolmogorov series `2 Σ (−1)^(j−1) exp(−2 j² λ²)` at the Stephens-adjusted
/// λ.
fn asymptotic_sf(d: f64, n: f64) -> f64 {
    let sqrt_n = n.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    if lambda < 0.27 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-16 {
            break;
        }
        sign = -sign;
    }
    2.0 * sum
}

// ── Exact distribution (Marsaglia, Tsang & Wang) ─────────────────────

/// Square matrix in row-major order.
struct Matrix {
    order: usize,
    data: Vec<f64>,
}

impl Matrix {
    fn zeros(order: usize) -> Self {
        Self {
            order,
            data: vec![0.0; order * order],
        }
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.order + j]
    }

    fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        &mut self.data[i * self.order + j]
    }

    fn mul(&self, other: &Matrix) -> Matrix {
        let m = self.order;
        let mut out = Matrix::zeros(m);
        for i in 0..m {
            for k in 0..m {
                let a = self.at(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..m {
                    *out.at_mut(i, j) += a * other.at(k, j);
                }
            }
        }
        out
    }

    fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }
}

/// `base^power` with a decimal exponent carried alongside to avoid
/// overflow. Returns the mantissa matrix and its exponent.
fn matrix_power(base: &Matrix, power: usize) -> (Matrix, i32) {
    if power == 1 {
        return (
            Matrix {
                order: base.order,
                data: base.data.clone(),
            },
            0,
        );
    }
    let (half, half_exp) = matrix_power(base, power / 2);
    let mut out = half.mul(&half);
    let mut exp = 2 * half_exp;
    if power % 2 == 1 {
        out = base.mul(&out);
    }
    let centre = base.order / 2;
    if out.at(centre, centre) > SCALE {
        out.scale(1.0 / SCALE);
        exp += SCALE_EXP;
    }
    (out, exp)
}

/// P(D_n < d).
fn exact_cdf(n: usize, d: f64) -> f64 {
    let nf = n as f64;
    let k = (nf * d).floor() as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut hm = Matrix::zeros(m);
    for i in 0..m {
        for j in 0..m {
            if i + 1 >= j {
                *hm.at_mut(i, j) = 1.0;
            }
        }
    }
    for i in 0..m {
        *hm.at_mut(i, 0) -= h.powi(i as i32 + 1);
        *hm.at_mut(m - 1, i) -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        *hm.at_mut(m - 1, 0) += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                let mut fact = 1.0;
                for g in 1..=(i + 1 - j) {
                    fact *= g as f64;
                }
                *hm.at_mut(i, j) /= fact;
            }
        }
    }

    let (q, mut exp) = matrix_power(&hm, n);
    let mut s = q.at(k - 1, k - 1);
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1.0 / SCALE {
            s *= SCALE;
            exp -= SCALE_EXP;
        }
    }
    s * 10f64.powi(exp)
}
