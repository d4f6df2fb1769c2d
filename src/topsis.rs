use std::collections::BTreeSet;

use crate::error::ConfigurationError;
use crate::options::CoverageOption;
use crate::types::{Criterion, CriterionKind};
use crate::weights::{CriteriaWeights, WEIGHT_SUM_TOLERANCE};

/// Keeps the closeness ratio finite when an option sits on both references.
pub const CLOSENESS_EPSILON: f64 = 1e-12;

/// Options × criteria matrix of raw values.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionMatrix {
    criteria: Vec<Criterion>,
    rows: Vec<Vec<f64>>,
}

impl DecisionMatrix {
    pub fn new(criteria: Vec<Criterion>, rows: Vec<Vec<f64>>) -> Result<Self, ConfigurationError> {
        if let Some(bad) = rows.iter().position(|r| r.len() != criteria.len()) {
            return Err(ConfigurationError::InvalidParameter {
                name: "decision_matrix",
                reason: format!(
                    "row {bad} has {} values for {} criteria",
                    rows[bad].len(),
                    criteria.len()
                ),
            });
        }
        Ok(DecisionMatrix { criteria, rows })
    }

    /// Rows in option order, columns in `Criterion::ALL` order.
    pub fn from_options(options: &[CoverageOption]) -> Self {
        DecisionMatrix {
            criteria: Criterion::ALL.to_vec(),
            rows: options.iter().map(|o| o.criteria.0.to_vec()).collect(),
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Relative closeness of each row to the anti-ideal point, in [0, 1].
/// Higher is better. Output order matches the matrix rows.
pub fn closeness(
    matrix: &DecisionMatrix,
    weights: &CriteriaWeights,
) -> Result<Vec<f64>, ConfigurationError> {
    check_criteria(matrix, weights)?;
    if matrix.is_empty() {
        return Ok(Vec::new());
    }

    let n_cols = matrix.criteria.len();
    let mut weighted = matrix.rows.clone();
    let mut ideal = vec![0.0; n_cols];
    let mut anti_ideal = vec![0.0; n_cols];

    for (j, &criterion) in matrix.criteria.iter().enumerate() {
        let norm = matrix.rows.iter().map(|r| r[j] * r[j]).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        let w = weights.get(criterion).unwrap_or(0.0);

        let mut col_min = f64::INFINITY;
        let mut col_max = f64::NEG_INFINITY;
        for row in weighted.iter_mut() {
            row[j] = row[j] / norm * w;
            col_min = col_min.min(row[j]);
            col_max = col_max.max(row[j]);
        }
        (ideal[j], anti_ideal[j]) = match criterion.kind() {
            CriterionKind::Cost => (col_min, col_max),
            CriterionKind::Benefit => (col_max, col_min),
        };
    }

    Ok(weighted
        .iter()
        .map(|row| {
            let d_plus = distance(row, &ideal);
            let d_minus = distance(row, &anti_ideal);
            d_minus / (d_plus + d_minus + CLOSENESS_EPSILON)
        })
        .collect())
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Weights and matrix must both cover exactly the six fixed criteria, and the
/// weights must sum to 1.
fn check_criteria(
    matrix: &DecisionMatrix,
    weights: &CriteriaWeights,
) -> Result<(), ConfigurationError> {
    let expected: BTreeSet<Criterion> = Criterion::ALL.into_iter().collect();
    let from_weights: BTreeSet<Criterion> = weights.criteria().into_iter().collect();
    let from_matrix: BTreeSet<Criterion> = matrix.criteria.iter().copied().collect();
    if from_weights != from_matrix
        || from_matrix != expected
        || from_matrix.len() != matrix.criteria.len()
    {
        return Err(ConfigurationError::CriteriaMismatch {
            weights: weights.criteria(),
            matrix: matrix.criteria.clone(),
        });
    }
    let sum = weights.sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigurationError::WeightsNotNormalized { sum });
    }
    Ok(())
}

/// Row indices ordered by descending score. Equal scores keep input order.
pub fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}
