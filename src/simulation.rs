use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::ConfigurationError;

/// Standard deviation of the per-draw climate-risk perturbation before
/// scaling by company sensitivity. PLACEHOLDER calibration.
pub const DEFAULT_PERTURBATION_STD: f64 = 0.05;

/// Simulated climate-risk loss rate for one company.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskEstimate {
    pub mean: f64,
    pub std: f64,
}

impl RiskEstimate {
    pub fn deterministic(rate: f64) -> Self {
        RiskEstimate { mean: rate.clamp(0.0, 1.0), std: 0.0 }
    }
}

/// Per-company estimates plus the baseline used for companies with none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEstimates {
    pub baseline: f64,
    pub per_company: BTreeMap<String, RiskEstimate>,
}

impl RiskEstimates {
    /// Every company sits at the baseline with zero spread.
    pub fn degenerate(baseline: f64) -> Self {
        RiskEstimates { baseline, per_company: BTreeMap::new() }
    }

    pub fn for_company(&self, company: &str) -> RiskEstimate {
        self.per_company
            .get(company)
            .copied()
            .unwrap_or_else(|| RiskEstimate::deterministic(self.baseline))
    }
}

/// Monte Carlo sampler for climate-risk loss rates.
///
/// Each draw is `clip(baseline + z · sensitivity, 0, 1)` with
/// `z ~ Normal(0, perturbation_std)`. Sensitivity widens the spread; the
/// mean stays at the baseline except where clipping bites.
#[derive(Debug, Clone)]
pub struct ClimateRiskSimulator {
    perturbation: Normal<f64>,
    seed: u64,
}

impl ClimateRiskSimulator {
    pub fn new(perturbation_std: f64, seed: u64) -> Result<Self, ConfigurationError> {
        let perturbation = Normal::new(0.0, perturbation_std).map_err(|e| {
            ConfigurationError::InvalidParameter {
                name: "perturbation_std",
                reason: format!("{perturbation_std}: {e}"),
            }
        })?;
        Ok(ClimateRiskSimulator { perturbation, seed })
    }

    pub fn with_seed(seed: u64) -> Result<Self, ConfigurationError> {
        Self::new(DEFAULT_PERTURBATION_STD, seed)
    }

    /// Simulate `runs` draws per company.
    ///
    /// Company `i` (in slice order) draws from stream `i` of a ChaCha20
    /// generator keyed by `seed`, so results do not depend on rayon scheduling
    /// and no two seeds share a stream.
    /// `runs == 0` or an empty slice degenerates to the deterministic baseline.
    pub fn simulate(
        &self,
        baseline: f64,
        sensitivities: &[(String, f64)],
        runs: usize,
    ) -> RiskEstimates {
        let baseline = baseline.clamp(0.0, 1.0);
        if runs == 0 || sensitivities.is_empty() {
            tracing::debug!(runs, companies = sensitivities.len(), "monte carlo degenerate, using baseline");
            return RiskEstimates::degenerate(baseline);
        }

        let per_company: BTreeMap<String, RiskEstimate> = sensitivities
            .par_iter()
            .enumerate()
            .map(|(i, (company, sensitivity))| {
                let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
                rng.set_stream(i as u64);
                let draws: Vec<f64> = (0..runs)
                    .map(|_| {
                        let z = self.perturbation.sample(&mut rng);
                        (baseline + z * sensitivity).clamp(0.0, 1.0)
                    })
                    .collect();
                (company.clone(), summarize(&draws))
            })
            .collect();

        tracing::debug!(baseline, runs, companies = per_company.len(), "monte carlo complete");
        RiskEstimates { baseline, per_company }
    }
}

/// Sample mean and (n − 1) standard deviation, both clipped to [0, 1].
fn summarize(draws: &[f64]) -> RiskEstimate {
    let n = draws.len();
    let mean = draws.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    RiskEstimate { mean: mean.clamp(0.0, 1.0), std: variance.sqrt().clamp(0.0, 1.0) }
}
