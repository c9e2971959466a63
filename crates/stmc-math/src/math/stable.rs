//! Numerically stable primitives for log-domain sequential testing.
//!
//! Everything here stays in log space. Probabilities close to 0 or 1 go
//! through `ln_1p` so that `ln(1 - p)` keeps its precision, and running
//! statistics are rebuilt from exact integer counts with a fused
//! multiply-add instead of being summed term by term.

/// Wald's approximate decision boundaries for error rates `alpha` and `beta`.
///
/// Returns `(lower, upper)` where:
/// - `upper = ln((1 - beta) / alpha)`: crossing it rejects H0
/// - `lower = ln(beta / (1 - alpha))`: crossing it accepts H0
///
/// For `0 < alpha, beta < 1` with `alpha + beta < 1` this gives
/// `lower < 0 < upper`. NaN inputs propagate.
pub fn wald_boundaries(alpha: f64, beta: f64) -> (f64, f64) {
    let upper = (-beta).ln_1p() - alpha.ln();
    let lower = beta.ln() - (-alpha).ln_1p();
    (lower, upper)
}

/// Per-observation log-likelihood ratio increments of H1 `p = p1` against
/// H0 `p = p0` for a Bernoulli observation.
///
/// Returns `(q_pos, q_neg)`:
/// - `q_pos = ln(p1 / p0)` for a positive outcome
/// - `q_neg = ln((1 - p1) / (1 - p0))` for a negative outcome
///
/// With `p1 > p0` the positive step is positive and the negative step is
/// negative; `p1 < p0` swaps the signs.
pub fn log_odds_steps(p0: f64, p1: f64) -> (f64, f64) {
    let q_pos = p1.ln() - p0.ln();
    let q_neg = (-p1).ln_1p() - (-p0).ln_1p();
    (q_pos, q_neg)
}

/// Log-likelihood ratio of `k_pos` positive and `k_neg` negative outcomes.
///
/// Computed as `k_pos * q_pos + k_neg * q_neg` with a single rounding of the
/// product-sum, so the result depends only on the counts and never on the
/// order in which the outcomes arrived.
pub fn weighted_log_sum(k_pos: u64, q_pos: f64, k_neg: u64, q_neg: f64) -> f64 {
    match (k_pos, k_neg) {
        (0, 0) => 0.0,
        (0, n) => n as f64 * q_neg,
        (k, 0) => k as f64 * q_pos,
        (k, n) => (k as f64).mul_add(q_pos, n as f64 * q_neg),
    }
}

/// `x * ln(y)` with the convention `0 * ln(0) = 0`.
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 && !y.is_nan() {
        return 0.0;
    }
    x * y.ln()
}

/// `x * ln(1 + y)` with the convention `0 * ln(0) = 0`.
pub fn xlog1py(x: f64, y: f64) -> f64 {
    if x == 0.0 && !y.is_nan() {
        return 0.0;
    }
    x * y.ln_1p()
}

/// Find a root of `f` inside `[lo, hi]` by bisection.
///
/// The endpoints must bracket a sign change (either endpoint may be an exact
/// root). Returns `None` when they do not, when `f` produces NaN, or when
/// the bounds are not finite. Stops once the bracket is narrower than `tol`
/// or after `max_iter` halvings.
pub fn bisect<F>(mut f: F, lo: f64, hi: f64, tol: f64, max_iter: usize) -> Option<f64>
where
    F: FnMut(f64) -> f64,
{
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return None;
    }
    let (mut a, mut b) = (lo, hi);
    let mut fa = f(a);
    let fb = f(b);
    if fa.is_nan() || fb.is_nan() {
        return None;
    }
    if fa == 0.0 {
        return Some(a);
    }
    if fb == 0.0 {
        return Some(b);
    }
    if fa.signum() == fb.signum() {
        return None;
    }

    for _ in 0..max_iter {
        let mid = 0.5 * (a + b);
        let fm = f(mid);
        if fm.is_nan() {
            return None;
        }
        if fm == 0.0 || (b - a) * 0.5 < tol {
            return Some(mid);
        }
        if fm.signum() == fa.signum() {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
    }
    Some(0.5 * (a + b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn wald_boundaries_match_linear_formula() {
        let (lower, upper) = wald_boundaries(0.05, 0.10);
        assert!(approx_eq(upper, (0.90f64 / 0.05).ln(), 1e-12));
        assert!(approx_eq(lower, (0.10f64 / 0.95).ln(), 1e-12));
        assert!(lower < 0.0 && upper > 0.0);
    }

    #[test]
    fn wald_boundaries_tiny_error_rates_stay_finite() {
        let (lower, upper) = wald_boundaries(1e-300, 1e-300);
        assert!(lower.is_finite() && upper.is_finite());
        assert!(approx_eq(upper, -lower, 1e-9));
    }

    #[test]
    fn wald_boundaries_nan_propagates() {
        let (lower, upper) = wald_boundaries(f64::NAN, 0.1);
        assert!(lower.is_nan());
        assert!(upper.is_nan());
    }

    #[test]
    fn log_odds_steps_signs() {
        let (q_pos, q_neg) = log_odds_steps(0.5, 0.6);
        assert!(approx_eq(q_pos, (0.6f64 / 0.5).ln(), 1e-12));
        assert!(approx_eq(q_neg, (0.4f64 / 0.5).ln(), 1e-12));
        assert!(q_pos > 0.0 && q_neg < 0.0);

        let (q_pos, q_neg) = log_odds_steps(0.5, 0.4);
        assert!(q_pos < 0.0 && q_neg > 0.0);
    }

    #[test]
    fn log_odds_steps_near_one_keep_precision() {
        let (_, q_neg) = log_odds_steps(1.0 - 1e-12, 1.0 - 2e-12);
        assert!(approx_eq(q_neg, 2.0f64.ln(), 1e-3));
    }

    #[test]
    fn weighted_log_sum_zero_counts() {
        assert_eq!(weighted_log_sum(0, 1.0, 0, -1.0), 0.0);
        assert!(approx_eq(weighted_log_sum(3, 0.5, 0, -1.0), 1.5, 1e-12));
        assert!(approx_eq(weighted_log_sum(0, 0.5, 4, -0.25), -1.0, 1e-12));
    }

    #[test]
    fn weighted_log_sum_mixed() {
        let out = weighted_log_sum(7, 0.2, 3, -0.4);
        assert!(approx_eq(out, 7.0 * 0.2 - 3.0 * 0.4, 1e-12));
    }

    #[test]
    fn xlogy_zero_convention() {
        assert_eq!(xlogy(0.0, 0.0), 0.0);
        assert_eq!(xlog1py(0.0, -1.0), 0.0);
        assert!(approx_eq(xlogy(2.0, std::f64::consts::E), 2.0, 1e-12));
    }

    #[test]
    fn bisect_finds_sqrt_two() {
        let root = bisect(|x| x * x - 2.0, 0.0, 2.0, 1e-12, 200).unwrap();
        assert!(approx_eq(root, 2.0f64.sqrt(), 1e-10));
    }

    #[test]
    fn bisect_requires_bracket() {
        assert!(bisect(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 100).is_none());
        assert!(bisect(|x| x, 1.0, -1.0, 1e-12, 100).is_none());
        assert!(bisect(|_| f64::NAN, 0.0, 1.0, 1e-12, 100).is_none());
    }

    #[test]
    fn bisect_exact_endpoint_root() {
        assert_eq!(bisect(|x| x - 1.0, 1.0, 3.0, 1e-12, 100), Some(1.0));
    }
}
