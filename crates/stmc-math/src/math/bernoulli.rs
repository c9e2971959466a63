//! Bernoulli likelihoods and Wald's sample-size approximations.
//!
//! The sequential tests observe a stream of pass/fail outcomes, i.e.
//! `x ~ Bernoulli(p)`. This module provides:
//! - Log-likelihood of `k` successes in `n` trials
//! - Kullback-Leibler divergence between two Bernoulli distributions
//! - The expected log-likelihood increment per observation
//! - Wald's average sample number (ASN) for a simple-vs-simple SPRT

use super::stable::{xlog1py, xlogy};

/// Log-likelihood of `k` successes out of `n` Bernoulli(`p`) trials,
/// without the binomial coefficient.
///
/// `k ln p + (n - k) ln(1 - p)` with `0 * ln 0 = 0`, so `p = 0` or `p = 1`
/// are fine as long as the data agrees with them. Returns NaN if `k > n`
/// or `p` is outside `[0, 1]`.
pub fn log_likelihood(k: u64, n: u64, p: f64) -> f64 {
    if k > n || p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    let k_f = k as f64;
    let fails = (n - k) as f64;
    xlogy(k_f, p) + xlog1py(fails, -p)
}

/// KL divergence `D(Bern(p) || Bern(q))` in nats.
///
/// Returns `+inf` when `q` puts zero mass where `p` does not, and NaN for
/// arguments outside `[0, 1]`.
pub fn kl_divergence(p: f64, q: f64) -> f64 {
    if p.is_nan() || q.is_nan() || !(0.0..=1.0).contains(&p) || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    let pos = xlogy(p, p) - xlogy(p, q);
    let neg = xlog1py(1.0 - p, -p) - xlog1py(1.0 - p, -q);
    let kl = pos + neg;
    if kl.is_nan() {
        return f64::INFINITY;
    }
    kl.max(0.0)
}

/// Expected log-likelihood increment of one observation when the true
/// success probability is `p`: `p * q_pos + (1 - p) * q_neg`.
pub fn expected_step(p: f64, q_pos: f64, q_neg: f64) -> f64 {
    p.mul_add(q_pos, (1.0 - p) * q_neg)
}

/// Wald's average sample number for a simple SPRT of H0 `p = p0` against
/// H1 `p = p1` with error rates `alpha` and `beta`.
///
/// Uses the information-theoretic form of Wald's approximation:
/// - under H0: `D(Bern(alpha) || Bern(1 - beta)) / D(p0 || p1)`
/// - under H1: `D(Bern(1 - beta) || Bern(alpha)) / D(p1 || p0)`
///
/// Returns the larger of the two, which is the planning figure a caller
/// should budget for. `+inf` when `p0 == p1`.
pub fn wald_asn(alpha: f64, beta: f64, p0: f64, p1: f64) -> f64 {
    let under_h0 = kl_divergence(alpha, 1.0 - beta) / kl_divergence(p0, p1);
    let under_h1 = kl_divergence(1.0 - beta, alpha) / kl_divergence(p1, p0);
    if under_h0.is_nan() || under_h1.is_nan() {
        return f64::NAN;
    }
    under_h0.max(under_h1)
}

/// Wald's ASN when the true success probability is `p`, for arbitrary `p`
/// away from the boundary-crossing indifference point.
///
/// Uses `E_p[N] ≈ (P_p(reject) * upper + (1 - P_p(reject)) * lower) / E_p[z]`
/// with the operating characteristic approximated by the two simple
/// hypotheses: `P_p0(reject) = alpha`, `P_p1(reject) = 1 - beta`, linearly
/// interpolated in `p` and clamped to `[alpha, 1 - beta]`.
/// Returns `+inf` when the expected step is zero.
pub fn wald_asn_at(alpha: f64, beta: f64, p0: f64, p1: f64, p: f64) -> f64 {
    let (lower, upper) = super::stable::wald_boundaries(alpha, beta);
    let (q_pos, q_neg) = super::stable::log_odds_steps(p0, p1);
    let drift = expected_step(p, q_pos, q_neg);
    if drift == 0.0 {
        return f64::INFINITY;
    }
    let t = ((p - p0) / (p1 - p0)).clamp(0.0, 1.0);
    let reject = (alpha + t * (1.0 - beta - alpha)).clamp(alpha.min(1.0 - beta), alpha.max(1.0 - beta));
    let asn = (reject * upper + (1.0 - reject) * lower) / drift;
    if asn <= 0.0 {
        return f64::INFINITY;
    }
    asn
}
