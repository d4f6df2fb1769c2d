use serde::Serialize;

use crate::config::CompanyProfile;
use crate::error::DataError;
use crate::simulation::RiskEstimates;
use crate::types::{CoverageTier, Criterion, CriterionValues};

/// One (company, tier) package, the unit the ranking engine scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageOption {
    pub company: String,
    pub tier: CoverageTier,
    pub coverage: f64,
    /// Premium as a fraction of cargo value; mirrors the C1 criterion.
    pub premium_rate: f64,
    /// cargo value × premium rate.
    pub estimated_cost: f64,
    /// Tier-adjusted criterion values; C6 holds the simulated risk mean.
    pub criteria: CriterionValues,
    /// Simulated standard deviation of the climate-risk rate.
    pub risk_std: f64,
}

impl CoverageOption {
    pub fn risk_mean(&self) -> f64 {
        self.criteria.get(Criterion::ClimateRisk)
    }

    /// Multiply premium rate (and the C1 criterion) and cost by `factor`.
    pub fn load_premium(&mut self, factor: f64) {
        self.premium_rate *= factor;
        self.criteria.set(Criterion::PremiumRate, self.premium_rate);
        self.estimated_cost *= factor;
    }
}

/// Expand every company across every tier, company-major.
pub fn generate_options(
    companies: &[CompanyProfile],
    tiers: &[CoverageTier],
    risk: &RiskEstimates,
    cargo_value: f64,
) -> Result<Vec<CoverageOption>, DataError> {
    if companies.is_empty() {
        return Err(DataError::EmptyCompanyTable);
    }
    if tiers.is_empty() {
        return Err(DataError::EmptyTierTable);
    }

    let mut out = Vec::with_capacity(companies.len() * tiers.len());
    for company in companies {
        let estimate = risk.for_company(&company.name);
        for &tier in tiers {
            let mut criteria = company.criteria;
            let premium_rate = criteria.get(Criterion::PremiumRate) * tier.premium_multiplier();
            criteria.set(Criterion::PremiumRate, premium_rate);
            criteria.set(
                Criterion::CoverageSupport,
                criteria.get(Criterion::CoverageSupport) * tier.coverage(),
            );
            criteria.set(Criterion::ClimateRisk, estimate.mean);

            out.push(CoverageOption {
                company: company.name.clone(),
                tier,
                coverage: tier.coverage(),
                premium_rate,
                estimated_cost: cargo_value * premium_rate,
                criteria,
                risk_std: estimate.std,
            });
        }
    }
    Ok(out)
}
