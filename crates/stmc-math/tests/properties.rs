//! Property-based tests for stmc-math numerical functions.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use proptest::prelude::*;
use stmc_math::bernoulli::{expected_step, kl_divergence, log_likelihood, wald_asn};
use stmc_math::{bisect, log_odds_steps, wald_boundaries, weighted_log_sum};

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// Boundaries
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Boundaries straddle zero whenever alpha + beta < 1.
    #[test]
    fn boundaries_straddle_zero(alpha in 1e-9..0.49f64, beta in 1e-9..0.49f64) {
        let (lower, upper) = wald_boundaries(alpha, beta);
        prop_assert!(lower < 0.0, "lower {} for alpha={} beta={}", lower, alpha, beta);
        prop_assert!(upper > 0.0, "upper {} for alpha={} beta={}", upper, alpha, beta);
    }

    /// Swapping the error rates mirrors the boundaries.
    #[test]
    fn boundaries_mirror_on_swap(alpha in 1e-6..0.49f64, beta in 1e-6..0.49f64) {
        let (lower, upper) = wald_boundaries(alpha, beta);
        let (lower_swapped, upper_swapped) = wald_boundaries(beta, alpha);
        prop_assert!(approx_eq(upper, -lower_swapped, TOL));
        prop_assert!(approx_eq(lower, -upper_swapped, TOL));
    }
}

// ============================================================================
// Steps and weighted sums
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Swapping p0 and p1 negates both steps.
    #[test]
    fn steps_antisymmetric(p0 in 0.01..0.99f64, p1 in 0.01..0.99f64) {
        let (qp, qn) = log_odds_steps(p0, p1);
        let (qp_rev, qn_rev) = log_odds_steps(p1, p0);
        prop_assert!(approx_eq(qp, -qp_rev, TOL));
        prop_assert!(approx_eq(qn, -qn_rev, TOL));
    }

    /// Weighted sum equals the log-likelihood difference of the two models.
    #[test]
    fn weighted_sum_matches_likelihoods(
        p0 in 0.05..0.95f64,
        p1 in 0.05..0.95f64,
        k in 0u64..500,
        extra in 0u64..500,
    ) {
        let n = k + extra;
        let (qp, qn) = log_odds_steps(p0, p1);
        let llr = weighted_log_sum(k, qp, extra, qn);
        let direct = log_likelihood(k, n, p1) - log_likelihood(k, n, p0);
        prop_assert!(approx_eq(llr, direct, 1e-8), "llr={} direct={}", llr, direct);
    }

    /// Expected step under the alternative is the KL divergence.
    #[test]
    fn expected_step_is_kl(p0 in 0.05..0.95f64, p1 in 0.05..0.95f64) {
        let (qp, qn) = log_odds_steps(p0, p1);
        prop_assert!(approx_eq(expected_step(p1, qp, qn), kl_divergence(p1, p0), 1e-9));
    }
}

// ============================================================================
// KL divergence and ASN
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn kl_non_negative(p in 0.0..=1.0f64, q in 0.001..0.999f64) {
        let kl = kl_divergence(p, q);
        prop_assert!(kl >= 0.0, "kl({}, {}) = {}", p, q, kl);
    }

    /// ASN is positive and finite for separated hypotheses and grows as the
    /// separation shrinks.
    #[test]
    fn asn_monotone_in_separation(
        alpha in 0.001..0.2f64,
        beta in 0.001..0.2f64,
        theta in 0.2..0.7f64,
        delta in 0.02..0.1f64,
    ) {
        let wide = wald_asn(alpha, beta, theta, theta + delta);
        let narrow = wald_asn(alpha, beta, theta, theta + delta / 2.0);
        prop_assert!(wide.is_finite() && wide > 0.0);
        prop_assert!(narrow > wide, "narrow {} <= wide {}", narrow, wide);
    }
}

// ============================================================================
// Root finding
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn bisect_recovers_linear_root(root in -100.0..100.0f64, slope in 0.1..10.0f64) {
        let found = bisect(|x| slope * (x - root), -200.0, 200.0, 1e-12, 200).unwrap();
        prop_assert!(approx_eq(found, root, 1e-9), "found {} expected {}", found, root);
    }
}
