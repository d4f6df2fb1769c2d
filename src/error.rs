use std::path::PathBuf;

use crate::types::Criterion;

/// Defects in the request or in static configuration. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown priority profile: {name}")]
    UnknownProfile { name: String },

    #[error("criteria mismatch: weights cover {weights:?}, matrix has {matrix:?}")]
    CriteriaMismatch { weights: Vec<Criterion>, matrix: Vec<Criterion> },

    #[error("weights sum to {sum}, expected 1")]
    WeightsNotNormalized { sum: f64 },

    #[error("invalid weight for {criterion}: {value}")]
    InvalidWeight { criterion: Criterion, value: f64 },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Missing or unusable reference data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("company table is empty")]
    EmptyCompanyTable,

    #[error("coverage tier table is empty")]
    EmptyTierTable,

    #[error("historical risk table is empty")]
    EmptyHistory,

    #[error("route {route}: rate {value} at month {month} is outside [0, 1]")]
    RateOutOfRange { route: String, month: usize, value: f64 },

    #[error("company {company}: {field} is {value}, expected a finite non-negative value")]
    InvalidCompanyValue { company: String, field: String, value: f64 },

    #[error("company {name} appears more than once")]
    DuplicateCompany { name: String },

    #[error("cannot read reference data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse reference data {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
