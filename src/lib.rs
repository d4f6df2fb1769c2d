pub mod analysis;
pub mod confidence;
pub mod config;
pub mod error;
pub mod forecast;
pub mod options;
pub mod risk;
pub mod simulation;
pub mod topsis;
pub mod types;
pub mod weights;

pub use analysis::{AnalysisResult, RankedOption, run_analysis};
pub use config::{AnalysisParams, ReferenceCache, ReferenceData, ReferenceSource};
pub use error::{AnalysisError, ConfigurationError, DataError};
