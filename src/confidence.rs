/// Lowest confidence ever reported.
pub const CONFIDENCE_FLOOR: f64 = 0.3;
pub const CONFIDENCE_CEILING: f64 = 1.0;

const CV_EPSILON: f64 = 1e-9;
/// Raw confidences closer than this are treated as identical.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Confidence per option from the dispersion of its simulated climate risk.
///
/// Raw confidence is `1 / (1 + std / mean)`; the run's range is then mapped
/// linearly onto [0.3, 1.0]. If every option has the same raw confidence,
/// all get 1.0.
pub fn confidence_scores(risk: &[(f64, f64)]) -> Vec<f64> {
    let raw: Vec<f64> = risk
        .iter()
        .map(|&(mean, std)| {
            let cv = std / (mean + CV_EPSILON);
            1.0 / (1.0 + cv)
        })
        .collect();

    let lo = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo;
    if range.is_nan() || range <= FLAT_TOLERANCE {
        return vec![CONFIDENCE_CEILING; raw.len()];
    }

    raw.iter()
        .map(|r| {
            let scaled = CONFIDENCE_FLOOR + (CONFIDENCE_CEILING - CONFIDENCE_FLOOR) * (r - lo) / range;
            scaled.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
        })
        .collect()
}
