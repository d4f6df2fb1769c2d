use serde::Serialize;

use crate::error::DataError;
use crate::types::Month;

/// Observations required before the ARIMA path is attempted.
pub const MIN_ARIMA_OBSERVATIONS: usize = 6;

/// AR and MA coefficients are searched inside (−BOUND, BOUND).
const COEFFICIENT_BOUND: f64 = 0.99;
/// Coarse grid points per axis.
const GRID_STEPS: usize = 41;
/// Pattern-search rounds after the grid. Together with the grid this caps a
/// fit at a fixed number of objective evaluations.
const REFINE_ROUNDS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    /// ARIMA was not requested.
    Disabled,
    /// Fewer than `MIN_ARIMA_OBSERVATIONS` points up to the current month.
    InsufficientHistory,
    FitFailed,
}

/// Which estimator produced the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ForecastMethod {
    Arima { phi: f64, theta: f64 },
    Trend { reason: FallbackReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Observed rates up to and including the current month.
    pub history: Vec<f64>,
    /// One-step-ahead rate, clipped to [0, 1].
    pub forecast: [f64; 1],
    pub method: ForecastMethod,
}

impl Forecast {
    pub fn next_value(&self) -> f64 {
        self.forecast[0]
    }

    pub fn used_arima(&self) -> bool {
        matches!(self.method, ForecastMethod::Arima { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("series has {len} observations, need at least {min}", min = MIN_ARIMA_OBSERVATIONS)]
    TooShort { len: usize },

    #[error("non-finite observation at index {index}")]
    NonFinite { index: usize },

    #[error("no finite sum of squares on the search grid")]
    NoConvergence,
}

/// Conditional-sum-of-squares ARIMA(1,1,1) fit (no constant).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArimaFit {
    pub phi: f64,
    pub theta: f64,
    pub sse: f64,
    /// Unclipped one-step forecast in levels.
    pub forecast: f64,
}

/// One-step forecast of the climate-risk rate from `series` (January first),
/// using only months up to `current_month`.
pub fn forecast(series: &[f64], current_month: Month, use_arima: bool) -> Result<Forecast, DataError> {
    if series.is_empty() {
        return Err(DataError::EmptyHistory);
    }
    let cut = (current_month.0 as usize).clamp(1, series.len());
    let history = series[..cut].to_vec();

    let reason = if !use_arima {
        FallbackReason::Disabled
    } else if history.len() < MIN_ARIMA_OBSERVATIONS {
        FallbackReason::InsufficientHistory
    } else {
        match fit_arima_111(&history) {
            Ok(fit) if fit.forecast.is_finite() => {
                tracing::debug!(phi = fit.phi, theta = fit.theta, sse = fit.sse, "ARIMA(1,1,1) fitted");
                return Ok(Forecast {
                    history,
                    forecast: [fit.forecast.clamp(0.0, 1.0)],
                    method: ForecastMethod::Arima { phi: fit.phi, theta: fit.theta },
                });
            }
            Ok(fit) => {
                tracing::warn!(forecast = fit.forecast, "ARIMA forecast not finite, using trend");
                FallbackReason::FitFailed
            }
            Err(e) => {
                tracing::warn!(error = %e, "ARIMA fit failed, using trend");
                FallbackReason::FitFailed
            }
        }
    };

    let next = trend_forecast(&history);
    Ok(Forecast { history, forecast: [next], method: ForecastMethod::Trend { reason } })
}

/// Last value plus a short-window trend, clipped to [0, 1].
pub fn trend_forecast(history: &[f64]) -> f64 {
    let n = history.len();
    let Some(&last) = history.last() else {
        return 0.0;
    };
    let trend = match n {
        0 | 1 => 0.0,
        2 => last - history[0],
        _ => (last - history[n - 3]) / 2.0,
    };
    (last + trend).clamp(0.0, 1.0)
}

/// Fit ARIMA(1,1,1) on `series` by minimizing the conditional sum of squares
/// of the differenced series: coarse grid, then a bounded pattern search.
pub fn fit_arima_111(series: &[f64]) -> Result<ArimaFit, FitError> {
    if series.len() < MIN_ARIMA_OBSERVATIONS {
        return Err(FitError::TooShort { len: series.len() });
    }
    if let Some(index) = series.iter().position(|x| !x.is_finite()) {
        return Err(FitError::NonFinite { index });
    }
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let grid_step = 2.0 * COEFFICIENT_BOUND / (GRID_STEPS - 1) as f64;
    let mut best: Option<(f64, f64, f64)> = None;
    for i in 0..GRID_STEPS {
        let phi = -COEFFICIENT_BOUND + i as f64 * grid_step;
        for j in 0..GRID_STEPS {
            let theta = -COEFFICIENT_BOUND + j as f64 * grid_step;
            let sse = conditional_sse(&diffs, phi, theta);
            if sse.is_finite() && best.is_none_or(|(_, _, b)| sse < b) {
                best = Some((phi, theta, sse));
            }
        }
    }
    let (mut phi, mut theta, mut sse) = best.ok_or(FitError::NoConvergence)?;

    let mut step = grid_step / 2.0;
    for _ in 0..REFINE_ROUNDS {
        let mut improved = false;
        for (dp, dt) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            let p = (phi + dp * step).clamp(-COEFFICIENT_BOUND, COEFFICIENT_BOUND);
            let t = (theta + dt * step).clamp(-COEFFICIENT_BOUND, COEFFICIENT_BOUND);
            let candidate = conditional_sse(&diffs, p, t);
            if candidate.is_finite() && candidate < sse {
                (phi, theta, sse) = (p, t, candidate);
                improved = true;
            }
        }
        if !improved {
            step /= 2.0;
        }
    }

    let residuals = residuals(&diffs, phi, theta);
    let last_diff = diffs.last().copied().unwrap_or(0.0);
    let last_residual = residuals.last().copied().unwrap_or(0.0);
    let last_level = series[series.len() - 1];
    let forecast = last_level + phi * last_diff + theta * last_residual;

    Ok(ArimaFit { phi, theta, sse, forecast })
}

/// Innovations e_t = d_t − φ·d_{t−1} − θ·e_{t−1} for t ≥ 1, with e_0 = 0.
fn residuals(diffs: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(diffs.len().saturating_sub(1));
    let mut prev_e = 0.0;
    for w in diffs.windows(2) {
        let e = w[1] - phi * w[0] - theta * prev_e;
        out.push(e);
        prev_e = e;
    }
    out
}

fn conditional_sse(diffs: &[f64], phi: f64, theta: f64) -> f64 {
    residuals(diffs, phi, theta).iter().map(|e| e * e).sum()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use rand_distr::{Distribution, Normal};

    use super::*;

    #[test]
    fn two_point_trend_without_arima() {
        let f = forecast(&[0.3, 0.5], Month(2), false).unwrap();
        assert_eq!(f.history, vec![0.3, 0.5]);
        assert!((f.next_value() - 0.7).abs() < 1e-12, "got {}", f.next_value());
        assert_eq!(f.method, ForecastMethod::Trend { reason: FallbackReason::Disabled });
    }

    #[test]
    fn three_point_trend_uses_half_the_two_step_change() {
        assert!((trend_forecast(&[0.2, 0.9, 0.4]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_point_has_no_trend() {
        assert_eq!(trend_forecast(&[0.35]), 0.35);
    }

    #[test]
    fn trend_is_clipped() {
        assert_eq!(trend_forecast(&[0.5, 0.9]), 1.0);
        assert_eq!(trend_forecast(&[0.5, 0.1]), 0.0);
    }

    #[test]
    fn history_is_truncated_at_current_month() {
        let series = [0.1, 0.2, 0.3, 0.9, 0.9, 0.9, 0.9];
        let f = forecast(&series, Month(3), true).unwrap();
        assert_eq!(f.history, vec![0.1, 0.2, 0.3]);
        assert_eq!(f.method, ForecastMethod::Trend { reason: FallbackReason::InsufficientHistory });
        assert!((f.next_value() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn current_month_is_clamped_to_series_length() {
        let f = forecast(&[0.1, 0.2], Month(12), false).unwrap();
        assert_eq!(f.history.len(), 2);
        let f = forecast(&[0.1, 0.2], Month(0), false).unwrap();
        assert_eq!(f.history, vec![0.1]);
    }

    #[test]
    fn empty_series_is_data_error() {
        assert!(matches!(forecast(&[], Month(3), true), Err(DataError::EmptyHistory)));
    }

    #[test]
    fn arima_path_taken_with_enough_history() {
        let series = [0.28, 0.27, 0.29, 0.31, 0.34, 0.38, 0.42, 0.47, 0.52];
        let f = forecast(&series, Month(9), true).unwrap();
        assert!(f.used_arima(), "expected ARIMA, got {:?}", f.method);
        assert!((0.0..=1.0).contains(&f.next_value()));
        if let ForecastMethod::Arima { phi, theta } = f.method {
            assert!(phi.abs() <= COEFFICIENT_BOUND && theta.abs() <= COEFFICIENT_BOUND);
        }
    }

    #[test]
    fn non_finite_history_falls_back_to_trend() {
        let series = [f64::NAN, 0.2, 0.3, 0.4, 0.5, 0.6];
        let f = forecast(&series, Month(6), true).unwrap();
        assert_eq!(f.method, ForecastMethod::Trend { reason: FallbackReason::FitFailed });
        assert!((f.next_value() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let fit = fit_arima_111(&[0.4; 8]).unwrap();
        assert!((fit.forecast - 0.4).abs() < 1e-12);
        assert_eq!(fit.sse, 0.0);
    }

    #[test]
    fn fit_does_no_worse_than_random_walk() {
        // Integrated AR(1) with φ = 0.6.
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.01).unwrap();
        let mut level = 0.5;
        let mut prev_d = 0.0;
        let mut series = vec![level];
        for _ in 0..200 {
            let d = 0.6 * prev_d + noise.sample(&mut rng);
            level += d;
            series.push(level);
            prev_d = d;
        }
        let fit = fit_arima_111(&series).unwrap();
        let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
        let random_walk_sse = conditional_sse(&diffs, 0.0, 0.0);
        assert!(fit.sse <= random_walk_sse + 1e-12, "{} > {random_walk_sse}", fit.sse);
        // First impulse-response weight of ARMA(1,1) is φ + θ; the process has 0.6.
        let psi1 = fit.phi + fit.theta;
        assert!(psi1 > 0.3, "φ + θ = {psi1:.3} should reflect the positive autocorrelation");
    }

    #[test]
    fn short_series_is_rejected_by_fit() {
        assert!(matches!(fit_arima_111(&[0.1, 0.2]), Err(FitError::TooShort { len: 2 })));
    }
}
