//! Evidence labels for log-likelihood ratios.
//!
//! A sequential test carries its evidence as a log-likelihood ratio
//! `ln Λ = ln P(data|H1) - ln P(data|H0)`. This module turns that number
//! into presentation values for result explanations:
//! - the linear likelihood ratio, clamped so it never overflows
//! - the same evidence in bits
//! - a strength label on the Jeffreys scale and the favored hypothesis
//!
//! The raw log ratio is always kept alongside; labels are display-only.

use serde::Serialize;

/// Largest log ratio exponentiated without clamping. exp(700) is close to
/// the top of the f64 range.
pub const LOG_RATIO_MAX: f64 = 700.0;

/// Smallest log ratio exponentiated without clamping.
pub const LOG_RATIO_MIN: f64 = -700.0;

/// Linear likelihood ratio `exp(log_ratio)`, clamped to
/// `[exp(LOG_RATIO_MIN), exp(LOG_RATIO_MAX)]`.
///
/// `-inf` maps to 0, `+inf` to `f64::MAX`, NaN stays NaN.
pub fn likelihood_ratio(log_ratio: f64) -> f64 {
    if log_ratio.is_nan() {
        return f64::NAN;
    }
    if log_ratio == f64::NEG_INFINITY {
        return 0.0;
    }
    if log_ratio == f64::INFINITY {
        return f64::MAX;
    }
    log_ratio.clamp(LOG_RATIO_MIN, LOG_RATIO_MAX).exp()
}

/// Log ratio in bits instead of nats.
pub fn bits(log_ratio: f64) -> f64 {
    log_ratio / std::f64::consts::LN_2
}

/// Evidence strength on the Jeffreys scale, from `|ln Λ|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    /// No evidence at all (ratio of exactly 1).
    None,
    /// Below ln(3.2).
    Anecdotal,
    /// ln(3.2) to ln(10).
    Substantial,
    /// ln(10) to ln(32).
    Strong,
    /// ln(32) to ln(100).
    VeryStrong,
    /// ln(100) and above.
    Decisive,
}

impl EvidenceStrength {
    /// Classify `|log_ratio|`. NaN is treated as no evidence.
    pub fn from_log_ratio(log_ratio: f64) -> Self {
        const LN_3_2: f64 = 1.163_150_809_678_64;
        const LN_32: f64 = 3.465_735_902_799_727;
        const LN_100: f64 = 4.605_170_185_988_092;

        if log_ratio.is_nan() {
            return EvidenceStrength::None;
        }
        let magnitude = log_ratio.abs();
        if magnitude < f64::EPSILON {
            EvidenceStrength::None
        } else if magnitude < LN_3_2 {
            EvidenceStrength::Anecdotal
        } else if magnitude < std::f64::consts::LN_10 {
            EvidenceStrength::Substantial
        } else if magnitude < LN_32 {
            EvidenceStrength::Strong
        } else if magnitude < LN_100 {
            EvidenceStrength::VeryStrong
        } else {
            EvidenceStrength::Decisive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvidenceStrength::None => "no",
            EvidenceStrength::Anecdotal => "anecdotal",
            EvidenceStrength::Substantial => "substantial",
            EvidenceStrength::Strong => "strong",
            EvidenceStrength::VeryStrong => "very strong",
            EvidenceStrength::Decisive => "decisive",
        }
    }
}

impl std::fmt::Display for EvidenceStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which hypothesis the accumulated evidence favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceDirection {
    FavorsAlternative,
    FavorsNull,
    Neutral,
}

impl EvidenceDirection {
    pub fn from_log_ratio(log_ratio: f64) -> Self {
        if log_ratio.is_nan() || log_ratio.abs() < f64::EPSILON {
            EvidenceDirection::Neutral
        } else if log_ratio > 0.0 {
            EvidenceDirection::FavorsAlternative
        } else {
            EvidenceDirection::FavorsNull
        }
    }
}

/// Everything an explanation needs to describe one log-likelihood ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvidenceSummary {
    /// Raw log-likelihood ratio in nats.
    pub log_ratio: f64,
    /// Clamped linear likelihood ratio.
    pub likelihood_ratio: f64,
    /// Log ratio in bits.
    pub bits: f64,
    pub strength: EvidenceStrength,
    pub direction: EvidenceDirection,
}

impl EvidenceSummary {
    pub fn from_log_ratio(log_ratio: f64) -> Self {
        EvidenceSummary {
            log_ratio,
            likelihood_ratio: likelihood_ratio(log_ratio),
            bits: bits(log_ratio),
            strength: EvidenceStrength::from_log_ratio(log_ratio),
            direction: EvidenceDirection::from_log_ratio(log_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn likelihood_ratio_identity_at_zero() {
        assert!(approx_eq(likelihood_ratio(0.0), 1.0, 1e-12));
    }

    #[test]
    fn likelihood_ratio_clamps_extremes() {
        let big = likelihood_ratio(5_000.0);
        assert!(big.is_finite() && big > 1e300);
        let small = likelihood_ratio(-5_000.0);
        assert!((0.0..1e-300).contains(&small));
        assert_eq!(likelihood_ratio(f64::NEG_INFINITY), 0.0);
        assert_eq!(likelihood_ratio(f64::INFINITY), f64::MAX);
        assert!(likelihood_ratio(f64::NAN).is_nan());
    }

    #[test]
    fn bits_of_ln_two_is_one() {
        assert!(approx_eq(bits(std::f64::consts::LN_2), 1.0, 1e-12));
        assert!(approx_eq(bits(-std::f64::consts::LN_2), -1.0, 1e-12));
    }

    #[test]
    fn strength_scale() {
        assert_eq!(EvidenceStrength::from_log_ratio(0.0), EvidenceStrength::None);
        assert_eq!(EvidenceStrength::from_log_ratio(0.5), EvidenceStrength::Anecdotal);
        assert_eq!(
            EvidenceStrength::from_log_ratio(5.0f64.ln()),
            EvidenceStrength::Substantial
        );
        assert_eq!(EvidenceStrength::from_log_ratio(15.0f64.ln()), EvidenceStrength::Strong);
        assert_eq!(
            EvidenceStrength::from_log_ratio(50.0f64.ln()),
            EvidenceStrength::VeryStrong
        );
        assert_eq!(
            EvidenceStrength::from_log_ratio(-1000.0f64.ln()),
            EvidenceStrength::Decisive
        );
        assert_eq!(EvidenceStrength::from_log_ratio(f64::NAN), EvidenceStrength::None);
    }

    #[test]
    fn strength_is_ordered() {
        assert!(EvidenceStrength::Decisive > EvidenceStrength::Strong);
        assert!(EvidenceStrength::Anecdotal > EvidenceStrength::None);
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(
            EvidenceDirection::from_log_ratio(2.0),
            EvidenceDirection::FavorsAlternative
        );
        assert_eq!(EvidenceDirection::from_log_ratio(-2.0), EvidenceDirection::FavorsNull);
        assert_eq!(EvidenceDirection::from_log_ratio(0.0), EvidenceDirection::Neutral);
    }

    #[test]
    fn summary_packages_all_views() {
        let summary = EvidenceSummary::from_log_ratio(100.0f64.ln());
        assert!(approx_eq(summary.likelihood_ratio, 100.0, 1e-9));
        assert!(summary.bits > 6.6 && summary.bits < 6.7);
        assert_eq!(summary.strength, EvidenceStrength::Decisive);
        assert_eq!(summary.direction, EvidenceDirection::FavorsAlternative);
    }
}
