//! Conversion helpers for the PyO3 boundary.
//!
//! Everything here turns loosely typed Python inputs (numpy arrays, pandas
//! series, plain sequences, optional scalars) into the validated Rust types
//! the forecasting stack expects. All items are gated on `python-bindings`.
#[cfg(feature = "python-bindings")]
use std::time::Duration;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    forecasting::{
        core::{
            bars::PriceBar,
            grid::GridSpec,
            options::{DEFAULT_CHUNK_COUNT, DEFAULT_LATENCY, EvaluatorOptions, ForecastOptions},
        },
        errors::ForecastError,
        models::{
            gmm_hmm::{DEFAULT_MIN_STD, GmmHmm, HmmOptions},
            shape::HmmShape,
        },
    },
    optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 1-D float64 input into an owned Vec; `name` labels the error.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vec<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Vec<f64>> {
    let arr = extract_f64_array(py, raw)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(slice.to_vec())
}

/// Zip four equally long price columns into [`PriceBar`]s.
///
/// Values are not validated here; encoding the bars reports non-positive
/// opens and non-finite fields with their index.
#[cfg(feature = "python-bindings")]
pub fn extract_bars<'py>(
    py: Python<'py>, open: &Bound<'py, PyAny>, high: &Bound<'py, PyAny>,
    low: &Bound<'py, PyAny>, close: &Bound<'py, PyAny>,
) -> PyResult<Vec<PriceBar>> {
    let open = extract_f64_vec(py, open, "open")?;
    let high = extract_f64_vec(py, high, "high")?;
    let low = extract_f64_vec(py, low, "low")?;
    let close = extract_f64_vec(py, close, "close")?;

    let n = open.len();
    if high.len() != n || low.len() != n || close.len() != n {
        return Err(PyValueError::new_err(format!(
            "price columns must have equal length (open={}, high={}, low={}, close={})",
            n,
            high.len(),
            low.len(),
            close.len()
        )));
    }
    Ok((0..n).map(|i| PriceBar::new(open[i], high[i], low[i], close[i])).collect())
}

/// Optimizer options from optional Python arguments.
///
/// With no tolerance given at all, the default tolerances are used instead of
/// failing with "no tolerances provided".
#[cfg(feature = "python-bindings")]
pub fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
) -> PyResult<MLEOptions> {
    use std::str::FromStr;

    // Tolerances::new -> OptResult<Tolerances> -> ForecastError -> PyErr
    let tols = if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
        MLEOptions::default().tols
    } else {
        Tolerances::new(tol_grad, tol_cost, max_iter).map_err(ForecastError::from)?
    };
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name).map_err(ForecastError::from)?,
        None => LineSearcher::MoreThuente,
    };
    let opts = MLEOptions::new(tols, ls, lbfgs_mem).map_err(ForecastError::from)?;
    Ok(opts)
}

/// Build an unfitted [`GmmHmm`] from optional Python arguments.
///
/// Defaults: 4 hidden states, 5 mixture components, `min_std = 1e-4`.
#[cfg(feature = "python-bindings")]
pub fn build_gmm_hmm(
    n_components: Option<usize>, n_mix: Option<usize>, min_std: Option<f64>,
    mle_opts: MLEOptions,
) -> PyResult<GmmHmm> {
    let defaults = HmmShape::default();
    let shape = HmmShape::new(
        n_components.unwrap_or(defaults.n_components),
        n_mix.unwrap_or(defaults.n_mix),
    )?;
    let options = HmmOptions::new(mle_opts, min_std.unwrap_or(DEFAULT_MIN_STD))?;
    Ok(GmmHmm::new(shape, options))
}

/// Build [`ForecastOptions`] on the default candidate grid.
#[cfg(feature = "python-bindings")]
pub fn extract_forecast_opts(
    latency: Option<usize>, chunk_count: Option<usize>, workers: Option<usize>,
    deadline_secs: Option<f64>,
) -> PyResult<ForecastOptions> {
    let deadline = match deadline_secs {
        None => None,
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(_) => {
            return Err(ForecastError::InvalidDeadline {
                reason: "deadline_secs must be a finite positive number",
            }
            .into());
        }
    };
    let evaluator =
        EvaluatorOptions::new(chunk_count.unwrap_or(DEFAULT_CHUNK_COUNT), workers, deadline)?;
    let opts =
        ForecastOptions::new(latency.unwrap_or(DEFAULT_LATENCY), GridSpec::default(), evaluator)?;
    Ok(opts)
}
