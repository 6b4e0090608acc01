//! Forecast accuracy metrics.
use ndarray::ArrayView1;

use crate::forecasting::errors::{ForecastError, ForecastResult};

/// Mean absolute percentage error, in percent:
/// `(1/n) · Σ |pred − actual| / |actual| · 100`.
///
/// # Errors
/// - [`ForecastError::LengthMismatch`] if the series differ in length.
/// - [`ForecastError::EmptySeries`] if both are empty.
///
/// A zero `actual` yields `inf`, and NaN inputs yield NaN; callers decide
/// what to do with those.
pub fn mean_abs_percent_error(
    predicted: ArrayView1<f64>, actual: ArrayView1<f64>,
) -> ForecastResult<f64> {
    if predicted.len() != actual.len() {
        return Err(ForecastError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if predicted.is_empty() {
        return Err(ForecastError::EmptySeries);
    }
    let n = predicted.len() as f64;
    let total: f64 =
        predicted.iter().zip(actual.iter()).map(|(p, a)| (p - a).abs() / a.abs()).sum();
    Ok(total / n * 100.0)
}
