use serde::Serialize;

use crate::confidence::confidence_scores;
use crate::config::{AnalysisParams, ReferenceData};
use crate::error::AnalysisError;
use crate::forecast::{self, Forecast};
use crate::options::{CoverageOption, generate_options};
use crate::risk::{TailRisk, var_cvar};
use crate::simulation::{ClimateRiskSimulator, RiskEstimates};
use crate::topsis::{self, DecisionMatrix};
use crate::types::{Category, Criterion};
use crate::weights::{
    CriteriaWeights, FuzzyWeight, PriorityProfile, build_weights, fuzzy_table,
    most_uncertain_criterion,
};

/// Cargo values strictly above this carry a premium loading.
pub const SURCHARGE_THRESHOLD: f64 = 50_000.0;
pub const SURCHARGE_MULTIPLIER: f64 = 1.1;

/// A scored option, in rank order within `AnalysisResult::options`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOption {
    #[serde(flatten)]
    pub option: CoverageOption,
    /// 1-based position by descending score.
    pub rank: usize,
    pub score: f64,
    pub confidence: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub profile: PriorityProfile,
    pub route: String,
    /// Climate-risk rate for the route and month that seeded the simulator.
    pub baseline_risk: f64,
    pub options: Vec<RankedOption>,
    /// Effective weights after any fuzzy adjustment.
    pub weights: CriteriaWeights,
    /// Present when fuzzy weighting was applied.
    pub fuzzy_table: Option<Vec<FuzzyWeight>>,
    /// Criterion with the widest fuzzy band, when fuzzy weighting was applied.
    pub most_uncertain: Option<Criterion>,
    pub tail_risk: Option<TailRisk>,
    pub forecast: Forecast,
    pub surcharge_applied: bool,
}

impl AnalysisResult {
    pub fn top(&self) -> Option<&RankedOption> {
        self.options.first()
    }
}

/// Load large shipments: premium and cost × 1.1 above the threshold.
/// Returns whether the loading was applied.
pub fn apply_surcharge(options: &mut [CoverageOption], cargo_value: f64) -> bool {
    if cargo_value <= SURCHARGE_THRESHOLD {
        return false;
    }
    for option in options.iter_mut() {
        option.load_premium(SURCHARGE_MULTIPLIER);
    }
    true
}

/// Run the full ranking pipeline for one request.
///
/// Errors only on configuration or reference-data defects; numerical
/// degeneracies resolve to defined fallback values.
pub fn run_analysis(
    params: &AnalysisParams,
    reference: &ReferenceData,
) -> Result<AnalysisResult, AnalysisError> {
    params.validate()?;
    reference.validate()?;

    // ── Weights ───────────────────────────────────────────────────────────────
    let profile: PriorityProfile = params.priority_profile.parse()?;
    let weights =
        build_weights(&params.priority_profile, params.use_fuzzy, params.fuzzy_uncertainty)?;
    let (fuzzy, most_uncertain) = if params.use_fuzzy {
        let base = profile.weights();
        let widest = most_uncertain_criterion(&base, params.fuzzy_uncertainty)?;
        (Some(fuzzy_table(&base, params.fuzzy_uncertainty)?), widest.map(|(c, _)| c))
    } else {
        (None, None)
    };

    // ── Climate risk ──────────────────────────────────────────────────────────
    let series = reference.route_series(&params.route)?;
    let baseline_risk = series.baseline_rate(params.month);
    let risk = if params.use_monte_carlo {
        ClimateRiskSimulator::with_seed(params.seed)?.simulate(
            baseline_risk,
            &reference.sensitivities(),
            params.mc_runs,
        )
    } else {
        RiskEstimates::degenerate(baseline_risk)
    };

    // ── Options and ranking ──────────────────────────────────────────────────
    let mut options =
        generate_options(&reference.companies, &reference.tiers, &risk, params.cargo_value)?;
    let surcharge_applied = apply_surcharge(&mut options, params.cargo_value);

    let scores = topsis::closeness(&DecisionMatrix::from_options(&options), &weights)?;
    let order = topsis::rank_order(&scores);

    let mut slots: Vec<Option<CoverageOption>> = options.into_iter().map(Some).collect();
    let ranked: Vec<(CoverageOption, f64)> = order
        .iter()
        .filter_map(|&i| slots[i].take().map(|o| (o, scores[i])))
        .collect();

    let dispersion: Vec<(f64, f64)> =
        ranked.iter().map(|(o, _)| (o.risk_mean(), o.risk_std)).collect();
    let confidence = confidence_scores(&dispersion);

    let options: Vec<RankedOption> = ranked
        .into_iter()
        .zip(confidence)
        .enumerate()
        .map(|(i, ((option, score), confidence))| RankedOption {
            category: option.tier.category(),
            option,
            rank: i + 1,
            score,
            confidence,
        })
        .collect();

    // ── Tail risk and forecast ───────────────────────────────────────────────
    let tail_risk = params.use_var.then(|| {
        let rates: Vec<f64> = options.iter().map(|r| r.option.risk_mean()).collect();
        var_cvar(&rates, params.cargo_value, params.var_confidence)
    });
    let forecast = forecast::forecast(&series.monthly, params.month, params.use_arima)?;

    if let Some(top) = options.first() {
        tracing::info!(
            profile = profile.slug(),
            route = %series.route,
            options = options.len(),
            top_company = %top.option.company,
            top_tier = %top.option.tier,
            top_score = top.score,
            "analysis complete"
        );
    }

    Ok(AnalysisResult {
        profile,
        route: series.route.clone(),
        baseline_risk,
        options,
        weights,
        fuzzy_table: fuzzy,
        most_uncertain,
        tail_risk,
        forecast,
        surcharge_applied,
    })
}
