use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether lower or higher raw values are preferred for a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriterionKind {
    Cost,
    Benefit,
}

/// The six decision criteria every coverage option is scored on.
/// Declaration order is the canonical column order (C1..C6).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Criterion {
    PremiumRate,
    ProcessingTime,
    LossRatio,
    CoverageSupport,
    CustomerCare,
    ClimateRisk,
}

impl Criterion {
    pub const COUNT: usize = 6;

    pub const ALL: [Criterion; Self::COUNT] = [
        Criterion::PremiumRate,
        Criterion::ProcessingTime,
        Criterion::LossRatio,
        Criterion::CoverageSupport,
        Criterion::CustomerCare,
        Criterion::ClimateRisk,
    ];

    /// Column index into a `CriterionValues` row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> CriterionKind {
        match self {
            Criterion::CoverageSupport | Criterion::CustomerCare => CriterionKind::Benefit,
            Criterion::PremiumRate
            | Criterion::ProcessingTime
            | Criterion::LossRatio
            | Criterion::ClimateRisk => CriterionKind::Cost,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Criterion::PremiumRate => "C1: Premium rate",
            Criterion::ProcessingTime => "C2: Processing time",
            Criterion::LossRatio => "C3: Loss ratio",
            Criterion::CoverageSupport => "C4: Coverage support",
            Criterion::CustomerCare => "C5: Customer care",
            Criterion::ClimateRisk => "C6: Climate risk",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw value per criterion, indexed by `Criterion::index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionValues(pub [f64; Criterion::COUNT]);

impl CriterionValues {
    pub fn get(&self, criterion: Criterion) -> f64 {
        self.0[criterion.index()]
    }

    pub fn set(&mut self, criterion: Criterion, value: f64) {
        self.0[criterion.index()] = value;
    }
}

/// Institute Cargo Clauses package level. Higher coverage costs more.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CoverageTier {
    IccA,
    IccB,
    IccC,
}

impl CoverageTier {
    pub const ALL: [CoverageTier; 3] = [CoverageTier::IccA, CoverageTier::IccB, CoverageTier::IccC];

    /// Fraction of insurable perils covered.
    pub fn coverage(self) -> f64 {
        match self {
            CoverageTier::IccA => 1.0,
            CoverageTier::IccB => 0.75,
            CoverageTier::IccC => 0.5,
        }
    }

    pub fn premium_multiplier(self) -> f64 {
        match self {
            CoverageTier::IccA => 1.5,
            CoverageTier::IccB => 1.0,
            CoverageTier::IccC => 0.65,
        }
    }

    pub fn category(self) -> Category {
        match self {
            CoverageTier::IccA => Category::Safety,
            CoverageTier::IccB => Category::Balanced,
            CoverageTier::IccC => Category::Economy,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoverageTier::IccA => "ICC A",
            CoverageTier::IccB => "ICC B",
            CoverageTier::IccC => "ICC C",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CoverageTier::IccA => "All risks except listed exclusions",
            CoverageTier::IccB => "Named perils: fire, collision, sinking and other major risks",
            CoverageTier::IccC => "Basic cover for major casualties only",
        }
    }
}

impl fmt::Display for CoverageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Display bucket for a ranked option, one per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Economy,
    Balanced,
    Safety,
}

/// Calendar month of the shipment, 1 = January.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month(pub u32);

impl Month {
    pub fn is_valid(self) -> bool {
        (1..=12).contains(&self.0)
    }
}
