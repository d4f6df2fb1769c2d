use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigurationError;
use crate::types::Criterion;

/// Lower clamp on a fuzzy weight so no criterion is dropped entirely.
pub const FUZZY_FLOOR: f64 = 1e-9;
/// Upper clamp on a fuzzy weight.
pub const FUZZY_CEILING: f64 = 0.9999;
/// Tolerance for "sums to 1" checks on externally supplied weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Ordered criterion → weight mapping. Weights are non-negative and sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaWeights(BTreeMap<Criterion, f64>);

impl CriteriaWeights {
    /// Accept weights that already sum to 1.
    pub fn new(
        entries: impl IntoIterator<Item = (Criterion, f64)>,
    ) -> Result<Self, ConfigurationError> {
        let map = collect_checked(entries)?;
        let sum: f64 = map.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightsNotNormalized { sum });
        }
        Ok(CriteriaWeights(map))
    }

    /// Scale arbitrary non-negative weights so they sum to 1.
    pub fn normalized(
        entries: impl IntoIterator<Item = (Criterion, f64)>,
    ) -> Result<Self, ConfigurationError> {
        let mut map = collect_checked(entries)?;
        let sum: f64 = map.values().sum();
        if sum <= 0.0 {
            return Err(ConfigurationError::WeightsNotNormalized { sum });
        }
        for w in map.values_mut() {
            *w /= sum;
        }
        Ok(CriteriaWeights(map))
    }

    pub fn get(&self, criterion: Criterion) -> Option<f64> {
        self.0.get(&criterion).copied()
    }

    pub fn criteria(&self) -> Vec<Criterion> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, f64)> + '_ {
        self.0.iter().map(|(c, w)| (*c, *w))
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

fn collect_checked(
    entries: impl IntoIterator<Item = (Criterion, f64)>,
) -> Result<BTreeMap<Criterion, f64>, ConfigurationError> {
    let mut map = BTreeMap::new();
    for (criterion, value) in entries {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::InvalidWeight { criterion, value });
        }
        map.insert(criterion, value);
    }
    Ok(map)
}

/// The three fixed priority profiles a shipper can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriorityProfile {
    CostSaving,
    Balanced,
    MaximumSafety,
}

impl PriorityProfile {
    pub const ALL: [PriorityProfile; 3] =
        [PriorityProfile::CostSaving, PriorityProfile::Balanced, PriorityProfile::MaximumSafety];

    pub fn slug(self) -> &'static str {
        match self {
            PriorityProfile::CostSaving => "cost-saving",
            PriorityProfile::Balanced => "balanced",
            PriorityProfile::MaximumSafety => "max-safety",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PriorityProfile::CostSaving => "Cost saving",
            PriorityProfile::Balanced => "Balanced",
            PriorityProfile::MaximumSafety => "Maximum safety",
        }
    }

    /// Weights in C1..C6 order.
    fn table(self) -> [f64; Criterion::COUNT] {
        match self {
            PriorityProfile::CostSaving => [0.35, 0.10, 0.15, 0.15, 0.10, 0.15],
            PriorityProfile::Balanced => [0.20, 0.15, 0.20, 0.20, 0.10, 0.15],
            PriorityProfile::MaximumSafety => [0.10, 0.10, 0.25, 0.25, 0.10, 0.20],
        }
    }

    pub fn weights(self) -> CriteriaWeights {
        CriteriaWeights(Criterion::ALL.into_iter().zip(self.table()).collect())
    }
}

impl FromStr for PriorityProfile {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PriorityProfile::ALL
            .into_iter()
            .find(|p| {
                p.slug().eq_ignore_ascii_case(needle) || p.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| ConfigurationError::UnknownProfile { name: s.to_string() })
    }
}

/// Symmetric triangular fuzzy number around a stated weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FuzzyWeight {
    pub criterion: Criterion,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl FuzzyWeight {
    pub fn centroid(&self) -> f64 {
        (self.low + self.mid + self.high) / 3.0
    }

    /// Width of the support, used to find the least certain criterion.
    pub fn spread(&self) -> f64 {
        self.high - self.low
    }
}

fn uncertainty_factor(uncertainty_pct: f64) -> Result<f64, ConfigurationError> {
    if !uncertainty_pct.is_finite() || !(0.0..=100.0).contains(&uncertainty_pct) {
        return Err(ConfigurationError::InvalidParameter {
            name: "fuzzy_uncertainty",
            reason: format!("{uncertainty_pct} is outside [0, 100]"),
        });
    }
    Ok(uncertainty_pct / 100.0)
}

/// Expand each weight into a triangular fuzzy number. This is the table the
/// front-end renders next to the defuzzified weights.
pub fn fuzzy_table(
    weights: &CriteriaWeights,
    uncertainty_pct: f64,
) -> Result<Vec<FuzzyWeight>, ConfigurationError> {
    let f = uncertainty_factor(uncertainty_pct)?;
    Ok(weights
        .iter()
        .map(|(criterion, w)| FuzzyWeight {
            criterion,
            low: (w * (1.0 - f)).max(FUZZY_FLOOR),
            mid: w,
            high: (w * (1.0 + f)).min(FUZZY_CEILING),
        })
        .collect())
}

/// Defuzzify by centroid and renormalize.
pub fn apply_fuzzy(
    weights: &CriteriaWeights,
    uncertainty_pct: f64,
) -> Result<CriteriaWeights, ConfigurationError> {
    let table = fuzzy_table(weights, uncertainty_pct)?;
    CriteriaWeights::normalized(table.iter().map(|fw| (fw.criterion, fw.centroid())))
}

/// The criterion whose fuzzy band is widest, with every band width.
/// Ties go to the earlier criterion.
pub fn most_uncertain_criterion(
    weights: &CriteriaWeights,
    uncertainty_pct: f64,
) -> Result<Option<(Criterion, BTreeMap<Criterion, f64>)>, ConfigurationError> {
    let table = fuzzy_table(weights, uncertainty_pct)?;
    let spreads: BTreeMap<Criterion, f64> =
        table.iter().map(|fw| (fw.criterion, fw.spread())).collect();
    let widest = table.iter().fold(None::<&FuzzyWeight>, |best, fw| match best {
        Some(b) if b.spread() >= fw.spread() => Some(b),
        _ => Some(fw),
    });
    Ok(widest.map(|fw| (fw.criterion, spreads)))
}

/// Resolve a profile by name and optionally apply fuzzy adjustment.
pub fn build_weights(
    profile_name: &str,
    use_fuzzy: bool,
    uncertainty_pct: f64,
) -> Result<CriteriaWeights, ConfigurationError> {
    let profile: PriorityProfile = profile_name.parse()?;
    let base = profile.weights();
    if use_fuzzy { apply_fuzzy(&base, uncertainty_pct) } else { Ok(base) }
}
