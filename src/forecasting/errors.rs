//! Errors for the forecasting pipeline (bar validation, configuration
//! checks, model failures, per-step search failures, and collaborators).
//!
//! [`ForecastError`] is the single error surface of the forecasting layer.
//! It implements `Display`/`Error` and, with the `python-bindings` feature,
//! converts to `PyErr` so the PyO3 boundary can surface it as `ValueError`.
//!
//! ## Conventions
//! - **Indices are 0-based**; `step` counts forecast steps from 0.
//! - Prices must be **finite**, and `open` must be **strictly positive**.
//! - Optimizer failures are normalized to [`ForecastError::OptimizationFailed`]
//!   with a human-readable status.
//! - Data source failures are flattened to text because `csv::Error` is
//!   neither `Clone` nor `PartialEq`. Reporter failures never become a
//!   `ForecastError`; they are logged and dropped.
use std::time::Duration;

use statrs::distribution::NormalError;

use crate::optimization::errors::OptError;

/// Crate-wide result alias for forecasting operations.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Unified error type for forecasting.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    // ---- Input/data validation ----
    /// Input series is empty.
    EmptySeries,

    /// A bar's open is ≤ 0, so fractional changes are undefined.
    NonPositiveOpen { index: usize, value: f64 },

    /// A bar field is NaN/±inf.
    NonFiniteBar { index: usize, field: &'static str, value: f64 },

    /// Fewer training observations than the latency depth.
    InsufficientHistory { required: usize, available: usize },

    /// Paired series have different lengths.
    LengthMismatch { predicted: usize, actual: usize },

    // ---- Options validation ----
    /// Latency depth must be ≥ 1.
    InvalidLatency { latency: usize, reason: &'static str },

    /// Chunk count must be ≥ 1.
    InvalidChunkCount { count: usize, reason: &'static str },

    /// Worker count must be ≥ 1 when given.
    InvalidWorkerCount { workers: usize, reason: &'static str },

    /// Per-step deadline must be non-zero when given.
    InvalidDeadline { reason: &'static str },

    /// Grid axis bounds or count are unusable.
    InvalidGridAxis { axis: &'static str, reason: &'static str },

    /// Model shape parameters must be ≥ 1.
    InvalidModelShape { param: &'static str, value: usize, reason: &'static str },

    /// Emission std floor must be finite and > 0.
    InvalidMinStd { value: f64 },

    /// The worker pool could not be built.
    ThreadPool { text: String },

    // ---- Model ----
    /// Model hasn't been fitted yet.
    ModelNotFitted,

    /// Wrapper for statrs::distribution::NormalError.
    InvalidEmission { reason: &'static str },

    /// Unconstrained parameter vector has the wrong length for the model.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Unconstrained parameters must be finite.
    InvalidThetaInput { index: usize, value: f64 },

    /// Optimizer failed; include a human-readable status/reason.
    OptimizationFailed { status: String },

    // ---- Forecast step ----
    /// Every candidate failed to score in this step.
    NoValidCandidates { step: usize },

    /// The step ran past its configured deadline.
    StepDeadlineExceeded { step: usize, deadline: Duration },

    // ---- Collaborators ----
    /// Historical data source failure.
    Source { text: String },
}

impl std::error::Error for ForecastError {}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            ForecastError::EmptySeries => {
                write!(f, "Input series is empty.")
            }
            ForecastError::NonPositiveOpen { index, value } => {
                write!(f, "Open price at index {index} must be > 0; got: {value}")
            }
            ForecastError::NonFiniteBar { index, field, value } => {
                write!(f, "Bar at index {index} has non-finite {field}: {value}")
            }
            ForecastError::InsufficientHistory { required, available } => {
                write!(
                    f,
                    "Need at least {required} training observations to seed the window; got {available}."
                )
            }
            ForecastError::LengthMismatch { predicted, actual } => {
                write!(f, "Series length mismatch: predicted {predicted}, actual {actual}")
            }

            // ---- Options validation ----
            ForecastError::InvalidLatency { latency, reason } => {
                write!(f, "Invalid latency {latency}: {reason}")
            }
            ForecastError::InvalidChunkCount { count, reason } => {
                write!(f, "Invalid chunk count {count}: {reason}")
            }
            ForecastError::InvalidWorkerCount { workers, reason } => {
                write!(f, "Invalid worker count {workers}: {reason}")
            }
            ForecastError::InvalidDeadline { reason } => {
                write!(f, "Invalid step deadline: {reason}")
            }
            ForecastError::InvalidGridAxis { axis, reason } => {
                write!(f, "Invalid grid axis '{axis}': {reason}")
            }
            ForecastError::InvalidModelShape { param, value, reason } => {
                write!(f, "Invalid model shape {param} = {value}: {reason}")
            }
            ForecastError::InvalidMinStd { value } => {
                write!(f, "Emission std floor must be finite and > 0; got: {value}")
            }
            ForecastError::ThreadPool { text } => {
                write!(f, "Failed to build worker pool: {text}")
            }

            // ---- Model ----
            ForecastError::ModelNotFitted => {
                write!(f, "Model has not been fitted.")
            }
            ForecastError::InvalidEmission { reason } => {
                write!(f, "Invalid emission distribution: {reason}")
            }
            ForecastError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            ForecastError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            ForecastError::OptimizationFailed { status } => {
                write!(f, "Optimization failed: {status}")
            }

            // ---- Forecast step ----
            ForecastError::NoValidCandidates { step } => {
                write!(f, "No candidate produced a valid score at step {step}.")
            }
            ForecastError::StepDeadlineExceeded { step, deadline } => {
                write!(f, "Step {step} exceeded its deadline of {deadline:?}.")
            }

            // ---- Collaborators ----
            ForecastError::Source { text } => {
                write!(f, "Price source error: {text}")
            }
        }
    }
}

/// Convert a [`ForecastError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ForecastError> for pyo3::PyErr {
    fn from(err: ForecastError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

impl From<OptError> for ForecastError {
    fn from(err: OptError) -> ForecastError {
        match err {
            OptError::ThetaLengthMismatch { expected, actual } => {
                ForecastError::ThetaLengthMismatch { expected, actual }
            }
            OptError::InvalidThetaInput { index, value } => {
                ForecastError::InvalidThetaInput { index, value }
            }
            other => ForecastError::OptimizationFailed { status: other.to_string() },
        }
    }
}

impl From<NormalError> for ForecastError {
    fn from(err: NormalError) -> ForecastError {
        match err {
            NormalError::MeanInvalid => {
                ForecastError::InvalidEmission { reason: "mean must be finite" }
            }
            NormalError::StandardDeviationInvalid => {
                ForecastError::InvalidEmission { reason: "std must be finite and > 0" }
            }
            _ => ForecastError::InvalidEmission { reason: "invalid normal parameters" },
        }
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> ForecastError {
        ForecastError::Source { text: err.to_string() }
    }
}

impl From<rayon::ThreadPoolBuildError> for ForecastError {
    fn from(err: rayon::ThreadPoolBuildError) -> ForecastError {
        ForecastError::ThreadPool { text: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Optimizer errors with a structural twin keep their fields; the rest are
    // summarized as `OptimizationFailed`.
    fn from_opt_error_keeps_structured_variants() {
        let structured = ForecastError::from(OptError::InvalidThetaInput { index: 2, value: 1.5 });
        let textual = ForecastError::from(OptError::MissingThetaHat);

        assert_eq!(structured, ForecastError::InvalidThetaInput { index: 2, value: 1.5 });
        assert_eq!(
            textual,
            ForecastError::OptimizationFailed { status: OptError::MissingThetaHat.to_string() }
        );
    }

    #[test]
    fn normal_error_maps_to_invalid_emission() {
        let err = ForecastError::from(NormalError::StandardDeviationInvalid);

        assert!(matches!(err, ForecastError::InvalidEmission { .. }));
    }
}
