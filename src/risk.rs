use serde::Serialize;

/// Default confidence level for VaR/CVaR.
pub const DEFAULT_VAR_CONFIDENCE: f64 = 0.95;

/// Tail-risk figures in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TailRisk {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
}

/// Linearly interpolated percentile of an ascending slice, `p` in [0, 1].
/// Matches the "linear" method of common numeric libraries.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

/// VaR and CVaR of `loss_rate × cargo_value` at `confidence`.
///
/// CVaR is the mean of losses at or above VaR, falling back to VaR when the
/// tail is empty. Empty input reports zero for both; this never fails.
pub fn var_cvar(loss_rates: &[f64], cargo_value: f64, confidence: f64) -> TailRisk {
    let mut losses: Vec<f64> = loss_rates
        .iter()
        .map(|r| r * cargo_value)
        .filter(|l| l.is_finite())
        .collect();
    losses.sort_by(|a, b| a.total_cmp(b));

    let Some(var) = percentile_sorted(&losses, confidence) else {
        return TailRisk { confidence, var: 0.0, cvar: 0.0 };
    };

    let tail: Vec<f64> = losses.iter().copied().filter(|&l| l >= var).collect();
    let cvar = if tail.is_empty() { var } else { tail.iter().sum::<f64>() / tail.len() as f64 };

    TailRisk { confidence, var, cvar: cvar.max(var) }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_input_is_zero_not_error() {
        let r = var_cvar(&[], 100_000.0, 0.95);
        assert_eq!(r.var, 0.0);
        assert_eq!(r.cvar, 0.0);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 0.5), Some(3.0));
        assert_eq!(percentile_sorted(&sorted, 1.0), Some(5.0));
        let p95 = percentile_sorted(&sorted, 0.95).unwrap();
        assert!((p95 - 4.8).abs() < 1e-12, "p95 {p95}");
        assert_eq!(percentile_sorted(&[], 0.5), None);
    }

    #[test]
    fn var_and_cvar_on_known_sample() {
        // Losses 0..=100 × 1_000 in steps of 1_000.
        let rates: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let r = var_cvar(&rates, 100_000.0, 0.95);
        assert!((r.var - 95_000.0).abs() < 1e-6, "var {}", r.var);
        // Tail is {95k..100k}, mean 97.5k.
        assert!((r.cvar - 97_500.0).abs() < 1e-6, "cvar {}", r.cvar);
    }

    #[test]
    fn single_observation_collapses_tail() {
        let r = var_cvar(&[0.42], 50_000.0, 0.95);
        assert!((r.var - 21_000.0).abs() < 1e-9);
        assert_eq!(r.var, r.cvar);
    }

    #[test]
    fn unsorted_input_is_handled() {
        let a = var_cvar(&[0.5, 0.1, 0.9, 0.3], 1_000.0, 0.95);
        let b = var_cvar(&[0.1, 0.3, 0.5, 0.9], 1_000.0, 0.95);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn var_never_exceeds_cvar(
            rates in proptest::collection::vec(0.0f64..1.0, 0..50),
            value in 1.0f64..1e7,
            confidence in 0.5f64..0.999,
        ) {
            let r = var_cvar(&rates, value, confidence);
            prop_assert!(r.var <= r.cvar, "var {} > cvar {}", r.var, r.cvar);
        }
    }
}
