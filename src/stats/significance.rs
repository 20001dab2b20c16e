use statrs::distribution::{ContinuousCDF, Normal};

use crate::model::Ratio;
use crate::stats::RatioBackground;

/// One side of a pairwise site comparison.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub ratio: Ratio,
    pub variance: f64,
}

/// Outcome of comparing one site across two datasets.
///
/// Finite pairs carry a real two-sided p-value. Pairs with at least one
/// infinite ratio only carry a binary decision from the sigma rule; they
/// enter the correction vector through `input_pvalue` with a surrogate of
/// 0.0 (significant) or 1.0 (not), so every pair gets a q-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairDecision {
    Finite { z: f64, p_value: f64 },
    InfinityRule { significant: bool },
}

impl PairDecision {
    pub fn input_pvalue(&self) -> f64 {
        match *self {
            PairDecision::Finite { p_value, .. } => p_value,
            PairDecision::InfinityRule { significant: true } => 0.0,
            PairDecision::InfinityRule { significant: false } => 1.0,
        }
    }

}

/// Decide whether two per-site ratios are statistically distinguishable.
///
/// Finite/finite pairs use the z-combination of two values with known
/// variances. When exactly one side is infinite, the finite ratio `r` is
/// compared against the background cutoff `mean + ns*sigma`: a +Infinity
/// side is distinguishable iff `r` falls below the cutoff, a -Infinity
/// side iff `r` falls above it. Both branches deliberately use the same
/// upper cutoff (the sign of the rule is not mirrored for -Infinity).
pub fn compare_pair(
    x: Observation,
    y: Observation,
    background: &RatioBackground,
    number_sigmas: u32,
) -> PairDecision {
    let cutoff = background.upper_cutoff(number_sigmas);
    match (x.ratio, y.ratio) {
        (Ratio::Finite(r1), Ratio::Finite(r2)) => {
            finite_pair(r1, x.variance, r2, y.variance)
        }
        (Ratio::PositiveInfinite, Ratio::Finite(r))
        | (Ratio::Finite(r), Ratio::PositiveInfinite) => PairDecision::InfinityRule {
            significant: r < cutoff,
        },
        (Ratio::NegativeInfinite, Ratio::Finite(r))
        | (Ratio::Finite(r), Ratio::NegativeInfinite) => PairDecision::InfinityRule {
            significant: r > cutoff,
        },
        (Ratio::PositiveInfinite, Ratio::PositiveInfinite)
        | (Ratio::NegativeInfinite, Ratio::NegativeInfinite) => {
            PairDecision::InfinityRule { significant: false }
        }
        (Ratio::PositiveInfinite, Ratio::NegativeInfinite)
        | (Ratio::NegativeInfinite, Ratio::PositiveInfinite) => {
            PairDecision::InfinityRule { significant: true }
        }
    }
}

fn finite_pair(r1: f64, v1: f64, r2: f64, v2: f64) -> PairDecision {
    let diff = r1 - r2;
    let denom = (v1 + v2).sqrt();
    let z = if denom == 0.0 {
        if diff == 0.0 { 0.0 } else { f64::INFINITY * diff.signum() }
    } else {
        diff / denom
    };
    // two-sided p from the standard normal
    let normal = Normal::new(0.0, 1.0).expect("unit normal");
    let p_value = if z.is_infinite() {
        0.0
    } else {
        2.0 * normal.cdf(-z.abs())
    };
    PairDecision::Finite { z, p_value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn background() -> RatioBackground {
        RatioBackground {
            mean: 1.0,
            sigma: 0.2,
            n_finite: 100,
        }
    }

    fn obs(ratio: Ratio, variance: f64) -> Observation {
        Observation { ratio, variance }
    }

    #[test]
    fn test_finite_pair_zero_difference() {
        let d = compare_pair(
            obs(Ratio::Finite(1.0), 0.1),
            obs(Ratio::Finite(1.0), 0.1),
            &background(),
            2,
        );
        match d {
            PairDecision::Finite { z, p_value } => {
                assert_eq!(z, 0.0);
                assert!((p_value - 1.0).abs() < 1e-12);
            }
            _ => panic!("expected finite decision"),
        }
    }

    #[test]
    fn test_finite_pair_known_z() {
        let d = compare_pair(
            obs(Ratio::Finite(2.0), 0.125),
            obs(Ratio::Finite(1.0), 0.125),
            &background(),
            2,
        );
        match d {
            PairDecision::Finite { z, p_value } => {
                assert!((z - 2.0).abs() < 1e-12);
                // 2 * Phi(-2) ~= 0.0455
                assert!((p_value - 0.04550026).abs() < 1e-6);
            }
            _ => panic!("expected finite decision"),
        }
    }

    #[test]
    fn test_finite_symmetry_under_swap() {
        let a = obs(Ratio::Finite(2.4), 0.3);
        let b = obs(Ratio::Finite(1.1), 0.2);
        let d1 = compare_pair(a, b, &background(), 2);
        let d2 = compare_pair(b, a, &background(), 2);
        match (d1, d2) {
            (
                PairDecision::Finite { z: z1, p_value: p1 },
                PairDecision::Finite { z: z2, p_value: p2 },
            ) => {
                assert!((z1 + z2).abs() < 1e-12, "z negates under swap");
                assert!((p1 - p2).abs() < 1e-12, "p is symmetric under swap");
            }
            _ => panic!("expected finite decisions"),
        }
    }

    #[test]
    fn test_positive_infinity_vs_high_finite_is_not_significant() {
        // cutoff = 1.0 + 2*0.2 = 1.4; 1.5 is within reach of the tail
        let d = compare_pair(
            obs(Ratio::PositiveInfinite, 0.0),
            obs(Ratio::Finite(1.5), 0.1),
            &background(),
            2,
        );
        assert_eq!(d, PairDecision::InfinityRule { significant: false });
    }

    #[test]
    fn test_positive_infinity_vs_low_finite_is_significant() {
        let d = compare_pair(
            obs(Ratio::PositiveInfinite, 0.0),
            obs(Ratio::Finite(1.2), 0.1),
            &background(),
            2,
        );
        assert_eq!(d, PairDecision::InfinityRule { significant: true });
    }

    #[test]
    fn test_infinity_rule_ignores_argument_order() {
        let d1 = compare_pair(
            obs(Ratio::PositiveInfinite, 0.0),
            obs(Ratio::Finite(1.2), 0.1),
            &background(),
            2,
        );
        let d2 = compare_pair(
            obs(Ratio::Finite(1.2), 0.1),
            obs(Ratio::PositiveInfinite, 0.0),
            &background(),
            2,
        );
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_negative_infinity_uses_upper_cutoff() {
        // rule compares r > mean + ns*sigma, not mean - ns*sigma
        let d = compare_pair(
            obs(Ratio::NegativeInfinite, 0.0),
            obs(Ratio::Finite(1.5), 0.1),
            &background(),
            2,
        );
        assert_eq!(d, PairDecision::InfinityRule { significant: true });

        let d = compare_pair(
            obs(Ratio::NegativeInfinite, 0.0),
            obs(Ratio::Finite(0.9), 0.1),
            &background(),
            2,
        );
        assert_eq!(d, PairDecision::InfinityRule { significant: false });
    }

    #[test]
    fn test_same_sign_infinities_never_significant() {
        for variance in [0.0, 0.5, 100.0] {
            let d = compare_pair(
                obs(Ratio::PositiveInfinite, variance),
                obs(Ratio::PositiveInfinite, variance),
                &background(),
                2,
            );
            assert_eq!(d, PairDecision::InfinityRule { significant: false });
            let d = compare_pair(
                obs(Ratio::NegativeInfinite, variance),
                obs(Ratio::NegativeInfinite, variance),
                &background(),
                2,
            );
            assert_eq!(d, PairDecision::InfinityRule { significant: false });
        }
    }

    #[test]
    fn test_opposite_sign_infinities_always_significant() {
        for variance in [0.0, 0.5, 100.0] {
            let d = compare_pair(
                obs(Ratio::PositiveInfinite, variance),
                obs(Ratio::NegativeInfinite, variance),
                &background(),
                2,
            );
            assert_eq!(d, PairDecision::InfinityRule { significant: true });
        }
    }

    #[test]
    fn test_surrogate_pvalues() {
        assert_eq!(
            PairDecision::InfinityRule { significant: true }.input_pvalue(),
            0.0
        );
        assert_eq!(
            PairDecision::InfinityRule { significant: false }.input_pvalue(),
            1.0
        );
        let finite = PairDecision::Finite {
            z: 1.0,
            p_value: 0.3173,
        };
        assert!((finite.input_pvalue() - 0.3173).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_distinct_ratios() {
        let d = compare_pair(
            obs(Ratio::Finite(2.0), 0.0),
            obs(Ratio::Finite(1.0), 0.0),
            &background(),
            2,
        );
        match d {
            PairDecision::Finite { p_value, .. } => assert_eq!(p_value, 0.0),
            _ => panic!("expected finite decision"),
        }
    }
}
