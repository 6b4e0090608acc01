//! frac_forecast — fractional-change price forecasting with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the forecasting stack to Python via the `_frac_forecast` extension module.
//! When the `python-bindings` feature is enabled, this module defines the
//! Python-facing classes and the `forecasting` submodule.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`forecasting` and `optimization`) as the
//!   public crate surface.
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_frac_forecast` Python extension.
//! - Register the `forecasting` submodule under `frac_forecast` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion, and error mapping.
//! - Python-visible types mirror the invariants of their Rust counterparts
//!   (`GmmHmm`, `Forecaster`, `OptimOutcome`).
//!
//! Conventions
//! -----------
//! - Price columns cross the boundary as four 1-D float64 arrays
//!   (`open`, `high`, `low`, `close`) of equal length, oldest bar first.
//! - Arrays enter as slices and leave as `Vec<f64>`; no ndarray type crosses
//!   the boundary, so numpy may resolve a different ndarray major version.
//! - Errors from core Rust code are propagated as [`ForecastError`] internally
//!   and converted to `ValueError` at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on [`forecasting`] and can ignore
//!   the PyO3 items guarded by the `python-bindings` feature.
//! - The Python packaging layer imports `_frac_forecast` and wraps its classes
//!   in user-facing APIs (data download, plotting).
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_forecast_pipeline.rs`.
//!
//! [`ForecastError`]: crate::forecasting::errors::ForecastError

pub mod forecasting;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use ndarray::ArrayView1;
#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    forecasting::{
        core::{bars::Observation, metrics, options::ForecastOptions},
        engine::{ForecastOutcome, Forecaster, train},
        errors::ForecastError,
        models::{gmm_hmm::GmmHmm, traits::SequenceModel},
    },
    optimization::loglik_optimizer::traits::OptimOutcome,
    utils::{
        build_gmm_hmm, extract_bars, extract_f64_vec, extract_forecast_opts, extract_mle_opts,
    },
};

/// HmmForecaster — Python-facing wrapper for the GMM-HMM forecast pipeline.
///
/// Purpose
/// -------
/// Hold a [`GmmHmm`] together with the training observations that seed the
/// forecast window, and expose the `train` / `test` workflow to Python.
///
/// Key behaviors
/// -------------
/// - `train(open, high, low, close)` encodes the bars, fits the model, and
///   keeps the encoded observations.
/// - `test(open, high, low, close)` runs the forecast loop over the test bars
///   and returns `(predicted, actual)` close arrays.
/// - `mape`, `results` and `is_fitted` expose diagnostics as properties.
///
/// Parameters
/// ----------
/// Constructed from Python via `HmmForecaster(n_components=4, n_mix=5,
/// latency=10, ...)`; every argument is optional. See the signature below.
///
/// Invariants
/// ----------
/// - `test` requires a prior successful `train` and at least `latency`
///   training observations.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "frac_forecast.forecasting", unsendable)]
pub struct HmmForecaster {
    pub model: GmmHmm,
    pub options: ForecastOptions,
    pub train_obs: Vec<Observation>,
    pub last_outcome: Option<ForecastOutcome>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl HmmForecaster {
    #[new]
    #[pyo3(
        signature = (
            n_components = None,
            n_mix = None,
            latency = None,
            chunk_count = None,
            workers = None,
            deadline_secs = None,
            min_std = None,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
        ),
        text_signature = "(n_components=4, n_mix=5, latency=10, chunk_count=20, workers=None, \
                          deadline_secs=None, min_std=1e-4, tol_grad=None, tol_cost=None, \
                          max_iter=None, line_searcher=None, lbfgs_mem=None)"
    )]
    pub fn new(
        n_components: Option<usize>, n_mix: Option<usize>, latency: Option<usize>,
        chunk_count: Option<usize>, workers: Option<usize>, deadline_secs: Option<f64>,
        min_std: Option<f64>, tol_grad: Option<f64>, tol_cost: Option<f64>,
        max_iter: Option<usize>, line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
    ) -> PyResult<Self> {
        let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, line_searcher, lbfgs_mem)?;
        let model = build_gmm_hmm(n_components, n_mix, min_std, mle_opts)?;
        let options = extract_forecast_opts(latency, chunk_count, workers, deadline_secs)?;
        Ok(HmmForecaster { model, options, train_obs: Vec::new(), last_outcome: None })
    }

    #[pyo3(text_signature = "(self, open, high, low, close, /)")]
    pub fn train<'py>(
        &mut self, py: Python<'py>, open: &Bound<'py, PyAny>, high: &Bound<'py, PyAny>,
        low: &Bound<'py, PyAny>, close: &Bound<'py, PyAny>,
    ) -> PyResult<()> {
        let bars = extract_bars(py, open, high, low, close)?;
        self.train_obs = train(&mut self.model, &bars)?;
        self.last_outcome = None;
        Ok(())
    }

    #[pyo3(text_signature = "(self, open, high, low, close, /)")]
    pub fn test<'py>(
        &mut self, py: Python<'py>, open: &Bound<'py, PyAny>, high: &Bound<'py, PyAny>,
        low: &Bound<'py, PyAny>, close: &Bound<'py, PyAny>,
    ) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
        let bars = extract_bars(py, open, high, low, close)?;
        let forecaster = Forecaster::new(&self.model, self.options)?;
        let outcome = forecaster.run(&self.train_obs, &bars)?;
        // numpy links its own ndarray, so results cross as plain Vecs.
        let predicted = outcome.predicted.to_vec().into_pyarray(py);
        let actual = outcome.actual.to_vec().into_pyarray(py);
        self.last_outcome = Some(outcome);
        Ok((predicted, actual))
    }

    #[getter]
    pub fn is_fitted(&self) -> bool {
        self.model.is_fitted()
    }

    #[getter]
    pub fn latency(&self) -> usize {
        self.options.latency
    }

    /// MAPE (percent) of the most recent `test` run.
    #[getter]
    pub fn mape(&self) -> PyResult<f64> {
        match &self.last_outcome {
            Some(outcome) => Ok(outcome.mape()?),
            None => Err(ForecastError::EmptySeries.into()),
        }
    }

    #[getter]
    pub fn results(&self) -> PyResult<HmmOptimOutcome> {
        match &self.model.results {
            Some(outcome) => Ok(HmmOptimOutcome { inner: outcome.clone() }),
            None => Err(ForecastError::ModelNotFitted.into()),
        }
    }
}

/// HmmOptimOutcome — optimizer diagnostics of a GMM-HMM fit, read-only.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "frac_forecast.forecasting", unsendable)]
pub struct HmmOptimOutcome {
    pub inner: OptimOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl HmmOptimOutcome {
    #[getter]
    pub fn theta_hat(&self) -> Vec<f64> {
        self.inner.theta_hat.to_vec()
    }

    /// Maximized log-likelihood.
    #[getter]
    pub fn value(&self) -> f64 {
        self.inner.value
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.status.clone()
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    pub fn grad_norm(&self) -> Option<f64> {
        self.inner.grad_norm
    }
}

/// Mean absolute percentage error of `predicted` against `actual`, in percent.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "mean_abs_percent_error", text_signature = "(predicted, actual, /)")]
fn py_mean_abs_percent_error<'py>(
    py: Python<'py>, predicted: &Bound<'py, PyAny>, actual: &Bound<'py, PyAny>,
) -> PyResult<f64> {
    let predicted = extract_f64_vec(py, predicted, "predicted")?;
    let actual = extract_f64_vec(py, actual, "actual")?;
    Ok(metrics::mean_abs_percent_error(
        ArrayView1::from(predicted.as_slice()),
        ArrayView1::from(actual.as_slice()),
    )?)
}

/// Python module initializer for `_frac_forecast`.
///
/// Creates the `forecasting` submodule, registers it on the parent, and
/// inserts it into `sys.modules` so `import frac_forecast.forecasting` works.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _frac_forecast<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let forecasting_mod = PyModule::new(_py, "forecasting")?;
    forecasting_module(_py, m, &forecasting_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("frac_forecast.forecasting", forecasting_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn forecasting_module<'py>(
    _py: Python, frac_forecast: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<HmmForecaster>()?;
    m.add_class::<HmmOptimOutcome>()?;
    m.add_function(wrap_pyfunction!(py_mean_abs_percent_error, m)?)?;
    frac_forecast.add_submodule(m)?;
    Ok(())
}
