use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, DataError};
use crate::types::{CoverageTier, Criterion, CriterionValues, Month};

/// Baseline climate-risk rate used when the series has no value for the month.
pub const DEFAULT_BASELINE_RISK: f64 = 0.40;

/// Static reference record for one insurer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Base values in C1..C6 order.
    pub criteria: CriterionValues,
    /// Scales simulated climate-risk volatility (not the mean).
    pub sensitivity: f64,
}

/// Monthly climate-risk loss rates for one trade route; `monthly[0]` is January.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSeries {
    pub route: String,
    pub monthly: Vec<f64>,
}

impl RouteSeries {
    /// Observed rate for `month`, or `DEFAULT_BASELINE_RISK` if the series is short.
    pub fn baseline_rate(&self, month: Month) -> f64 {
        (month.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.monthly.get(i))
            .copied()
            .unwrap_or(DEFAULT_BASELINE_RISK)
    }
}

/// All read-only tables the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub companies: Vec<CompanyProfile>,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<CoverageTier>,
    pub history: Vec<RouteSeries>,
}

fn default_tiers() -> Vec<CoverageTier> {
    CoverageTier::ALL.to_vec()
}

impl ReferenceData {
    pub fn canonical() -> Self {
        // ── Insurers ──────────────────────────────────────────────────────────
        // Columns: premium rate, processing days, loss ratio, ICC support
        // score (0-10), customer care score (0-10), climate-risk baseline.
        // All values are PLACEHOLDER calibration.
        let company = |name: &str, criteria: [f64; Criterion::COUNT], sensitivity: f64| {
            CompanyProfile { name: name.to_string(), criteria: CriterionValues(criteria), sensitivity }
        };
        let companies = vec![
            company("Chubb",   [0.0042,  7.0, 0.58, 9.0, 9.2, 0.38], 0.95),
            company("PVI",     [0.0035, 10.0, 0.65, 8.0, 8.1, 0.45], 1.05),
            company("BaoViet", [0.0033, 12.0, 0.62, 8.2, 8.3, 0.42], 1.00),
            company("BaoMinh", [0.0031, 14.0, 0.68, 7.6, 7.7, 0.47], 1.02),
            company("MIC",     [0.0029, 15.0, 0.71, 7.2, 7.4, 0.50], 1.03),
        ];

        // ── Historical climate-risk rates, Jan..Dec ───────────────────────────
        // Typhoon season peaks Aug-Oct on the Asian legs. PLACEHOLDER values.
        let route = |name: &str, monthly: [f64; 12]| RouteSeries {
            route: name.to_string(),
            monthly: monthly.to_vec(),
        };
        let history = vec![
            route("VN - EU",        [0.28, 0.27, 0.29, 0.31, 0.34, 0.38, 0.42, 0.47, 0.52, 0.49, 0.41, 0.33]),
            route("VN - US",        [0.30, 0.29, 0.30, 0.33, 0.36, 0.41, 0.45, 0.50, 0.55, 0.51, 0.43, 0.35]),
            route("VN - Singapore", [0.22, 0.21, 0.23, 0.25, 0.28, 0.31, 0.34, 0.38, 0.41, 0.39, 0.33, 0.26]),
            route("VN - China",     [0.25, 0.24, 0.26, 0.29, 0.33, 0.39, 0.44, 0.51, 0.56, 0.50, 0.40, 0.30]),
            route("Domestic",       [0.18, 0.17, 0.18, 0.20, 0.23, 0.27, 0.31, 0.36, 0.40, 0.42, 0.35, 0.24]),
        ];

        ReferenceData { companies, tiers: default_tiers(), history }
    }

    pub fn load_json(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path)
            .map_err(|source| DataError::Io { path: path.to_path_buf(), source })?;
        let data: ReferenceData = serde_json::from_str(&text)
            .map_err(|source| DataError::Parse { path: path.to_path_buf(), source })?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.companies.is_empty() {
            return Err(DataError::EmptyCompanyTable);
        }
        if self.tiers.is_empty() {
            return Err(DataError::EmptyTierTable);
        }
        if self.history.is_empty() || self.history.iter().all(|s| s.monthly.is_empty()) {
            return Err(DataError::EmptyHistory);
        }

        let mut seen = BTreeSet::new();
        for company in &self.companies {
            if !seen.insert(company.name.as_str()) {
                return Err(DataError::DuplicateCompany { name: company.name.clone() });
            }
            let fields = Criterion::ALL
                .iter()
                .map(|&c| (c.label().to_string(), company.criteria.get(c)))
                .chain(std::iter::once(("sensitivity".to_string(), company.sensitivity)));
            for (field, value) in fields {
                if !value.is_finite() || value < 0.0 {
                    return Err(DataError::InvalidCompanyValue {
                        company: company.name.clone(),
                        field,
                        value,
                    });
                }
            }
        }

        for series in &self.history {
            if let Some((i, &value)) =
                series.monthly.iter().enumerate().find(|&(_, r)| !(0.0..=1.0).contains(r))
            {
                return Err(DataError::RateOutOfRange {
                    route: series.route.clone(),
                    month: i + 1,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Series for `route`, falling back to the first route in the table.
    pub fn route_series(&self, route: &str) -> Result<&RouteSeries, DataError> {
        if let Some(series) = self.history.iter().find(|s| s.route == route) {
            return Ok(series);
        }
        let fallback = self.history.first().ok_or(DataError::EmptyHistory)?;
        tracing::warn!(requested = route, fallback = %fallback.route, "unknown route, using first route");
        Ok(fallback)
    }

    /// (company, sensitivity) pairs in table order.
    pub fn sensitivities(&self) -> Vec<(String, f64)> {
        self.companies.iter().map(|c| (c.name.clone(), c.sensitivity)).collect()
    }
}

/// Where a `ReferenceCache` loads its tables from.
#[derive(Debug, Clone)]
pub enum ReferenceSource {
    Canonical,
    JsonFile(PathBuf),
}

/// Lazily loaded, read-only reference tables. Loaded on first `get`,
/// reloaded only when `reload` is called.
#[derive(Debug)]
pub struct ReferenceCache {
    source: ReferenceSource,
    slot: RwLock<Option<Arc<ReferenceData>>>,
}

impl ReferenceCache {
    pub fn new(source: ReferenceSource) -> Self {
        ReferenceCache { source, slot: RwLock::new(None) }
    }

    pub fn get(&self) -> Result<Arc<ReferenceData>, DataError> {
        if let Some(data) = self.slot.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(Arc::clone(data));
        }
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have filled the slot while we waited for the lock.
        if let Some(data) = slot.as_ref() {
            return Ok(Arc::clone(data));
        }
        let data = Arc::new(self.load()?);
        *slot = Some(Arc::clone(&data));
        Ok(data)
    }

    /// Discard the cached tables and load them again from the source.
    /// The previous tables stay cached if loading fails.
    pub fn reload(&self) -> Result<Arc<ReferenceData>, DataError> {
        let data = Arc::new(self.load()?);
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&data));
        tracing::info!(source = ?self.source, "reference data reloaded");
        Ok(data)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn load(&self) -> Result<ReferenceData, DataError> {
        match &self.source {
            ReferenceSource::Canonical => Ok(ReferenceData::canonical()),
            ReferenceSource::JsonFile(path) => ReferenceData::load_json(path),
        }
    }
}

/// One user-triggered analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Monetary value of the cargo.
    pub cargo_value: f64,
    pub route: String,
    pub month: Month,
    /// Slug or display name of a `PriorityProfile`.
    pub priority_profile: String,
    pub use_fuzzy: bool,
    /// Prefer the ARIMA(1,1,1) forecaster over trend extrapolation.
    pub use_arima: bool,
    pub use_monte_carlo: bool,
    pub use_var: bool,
    pub mc_runs: usize,
    /// Fuzzy uncertainty in percent, 0-100.
    pub fuzzy_uncertainty: f64,
    pub var_confidence: f64,
    pub seed: u64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            cargo_value: 100_000.0,
            route: "VN - EU".to_string(),
            month: Month(9),
            priority_profile: "cost-saving".to_string(),
            use_fuzzy: true,
            use_arima: true,
            use_monte_carlo: true,
            use_var: true,
            mc_runs: 2_000,
            fuzzy_uncertainty: 15.0,
            var_confidence: 0.95,
            seed: 42,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.cargo_value.is_finite() || self.cargo_value <= 0.0 {
            return Err(invalid("cargo_value", format!("{} must be positive", self.cargo_value)));
        }
        if !self.month.is_valid() {
            return Err(invalid("month", format!("{} is outside 1-12", self.month.0)));
        }
        if !self.fuzzy_uncertainty.is_finite() || !(0.0..=100.0).contains(&self.fuzzy_uncertainty) {
            return Err(invalid(
                "fuzzy_uncertainty",
                format!("{} is outside [0, 100]", self.fuzzy_uncertainty),
            ));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(invalid(
                "var_confidence",
                format!("{} is outside (0, 1)", self.var_confidence),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigurationError {
    ConfigurationError::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn canonical_reference_is_valid() {
        let data = ReferenceData::canonical();
        data.validate().unwrap();
        assert_eq!(data.companies.len(), 5);
        assert_eq!(data.tiers.len(), 3);
        assert!(data.history.iter().all(|s| s.monthly.len() == 12));
        for s in &data.history {
            assert!(s.monthly.iter().all(|r| (0.0..=1.0).contains(r)), "{} out of range", s.route);
        }
    }

    #[test]
    fn baseline_rate_defaults_when_month_missing() {
        let series = RouteSeries { route: "X".into(), monthly: vec![0.1, 0.2, 0.3] };
        assert_eq!(series.baseline_rate(Month(2)), 0.2);
        assert_eq!(series.baseline_rate(Month(9)), DEFAULT_BASELINE_RISK);
        assert_eq!(series.baseline_rate(Month(0)), DEFAULT_BASELINE_RISK);
    }

    #[test]
    fn unknown_route_falls_back_to_first() {
        let data = ReferenceData::canonical();
        let series = data.route_series("Mars - Venus").unwrap();
        assert_eq!(series.route, "VN - EU");
        assert_eq!(data.route_series("Domestic").unwrap().route, "Domestic");
    }

    #[test]
    fn empty_tables_are_data_errors() {
        let mut data = ReferenceData::canonical();
        data.companies.clear();
        assert!(matches!(data.validate(), Err(DataError::EmptyCompanyTable)));

        let mut data = ReferenceData::canonical();
        data.tiers.clear();
        assert!(matches!(data.validate(), Err(DataError::EmptyTierTable)));

        let mut data = ReferenceData::canonical();
        data.history.clear();
        assert!(matches!(data.validate(), Err(DataError::EmptyHistory)));
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        for bad in [1.9, -0.4, f64::NAN] {
            let mut data = ReferenceData::canonical();
            data.history[1].monthly[8] = bad;
            match data.validate() {
                Err(DataError::RateOutOfRange { route, month, .. }) => {
                    assert_eq!(route, "VN - US");
                    assert_eq!(month, 9);
                }
                other => panic!("rate {bad} gave {other:?}"),
            }
        }
    }

    #[test]
    fn bad_company_values_are_rejected() {
        let mut data = ReferenceData::canonical();
        data.companies[2].criteria.set(Criterion::LossRatio, -0.1);
        assert!(matches!(
            data.validate(),
            Err(DataError::InvalidCompanyValue { ref company, .. }) if company == "BaoViet"
        ));

        let mut data = ReferenceData::canonical();
        data.companies[0].sensitivity = f64::INFINITY;
        assert!(matches!(
            data.validate(),
            Err(DataError::InvalidCompanyValue { ref field, .. }) if field == "sensitivity"
        ));
    }

    #[test]
    fn duplicate_company_is_rejected() {
        let mut data = ReferenceData::canonical();
        let copy = data.companies[1].clone();
        data.companies.push(copy);
        assert!(matches!(
            data.validate(),
            Err(DataError::DuplicateCompany { ref name }) if name == "PVI"
        ));
    }

    #[test]
    fn json_with_out_of_range_rates_fails_to_load() {
        let mut data = ReferenceData::canonical();
        data.history[0].monthly = vec![1.7, -0.4, 2.5, 3.0, 1.2, 1.8, 1.1, 2.0, 1.9];
        let path =
            std::env::temp_dir().join(format!("riskcast-bad-ref-{}.json", std::process::id()));
        fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();
        let err = ReferenceData::load_json(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::RateOutOfRange { month: 1, .. }), "{err:?}");
    }

    #[test]
    fn json_round_trip_through_file() {
        let data = ReferenceData::canonical();
        let path = std::env::temp_dir().join(format!("riskcast-ref-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string(&data).unwrap().as_bytes()).unwrap();
        drop(file);

        let loaded = ReferenceData::load_json(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, data);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ReferenceData::load_json(Path::new("/nonexistent/riskcast.json")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn cache_loads_lazily_and_reuses() {
        let cache = ReferenceCache::new(ReferenceSource::Canonical);
        assert!(!cache.is_loaded());
        let a = cache.get().unwrap();
        assert!(cache.is_loaded());
        let b = cache.get().unwrap();
        assert!(Arc::ptr_eq(&a, &b), "second get must hit the cache");
        let c = cache.reload().unwrap();
        assert!(!Arc::ptr_eq(&a, &c), "reload must replace the cached tables");
    }

    #[test]
    fn failed_load_leaves_cache_empty() {
        let cache = ReferenceCache::new(ReferenceSource::JsonFile("/nonexistent/ref.json".into()));
        assert!(cache.get().is_err());
        assert!(!cache.is_loaded());
    }

    #[test]
    fn params_validation() {
        assert!(AnalysisParams::default().validate().is_ok());
        let bad = [
            AnalysisParams { cargo_value: 0.0, ..Default::default() },
            AnalysisParams { cargo_value: f64::INFINITY, ..Default::default() },
            AnalysisParams { month: Month(13), ..Default::default() },
            AnalysisParams { fuzzy_uncertainty: 120.0, ..Default::default() },
            AnalysisParams { var_confidence: 1.0, ..Default::default() },
        ];
        for p in bad {
            assert!(
                matches!(p.validate(), Err(ConfigurationError::InvalidParameter { .. })),
                "{p:?} should be rejected"
            );
        }
    }
}
