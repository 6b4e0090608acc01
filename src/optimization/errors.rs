//! Errors for the log-likelihood optimizer (configuration, derivative
//! validation, solver outcome, and backend failures).
//!
//! [`OptError`] is the single error surface of the optimization layer. Model
//! code returns it from [`LogLikelihood`] implementations, and backend
//! `argmin` errors are normalized into it via `From<argmin::core::Error>`.
//!
//! [`LogLikelihood`]: crate::optimization::loglik_optimizer::LogLikelihood
use argmin::core::{ArgminError, Error};

use crate::forecasting::errors::ForecastError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch { expected: usize, found: usize },

    /// Gradient elements need to be finite
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad { tol: f64, reason: &'static str },

    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost { tol: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch { name: String, reason: &'static str },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost { value: f64 },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Argmin ---
    /// Solver-side failure reported by argmin. `kind` names the argmin error
    /// class ("condition violated", "not initialized", ...); `text` is its
    /// message.
    Solver { kind: &'static str, text: String },

    // ---- Model errors ----
    /// Unconstrained parameter vector has the wrong length for the model.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Unconstrained optimization input must have finite values.
    InvalidThetaInput { index: usize, value: f64 },

    /// Any other model-side failure raised while evaluating the likelihood.
    ModelError { text: String },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient optimization not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Argmin ----
            OptError::Solver { kind, text } => {
                write!(f, "Solver failure ({kind}): {text}")
            }

            // ---- Model errors ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            OptError::ModelError { text } => {
                write!(f, "Model error: {text}")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own cost/gradient code come back wrapped.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast::<ArgminError>() {
            Ok(native) => {
                let (kind, text) = match native {
                    ArgminError::InvalidParameter { text } => ("invalid parameter", text),
                    ArgminError::NotImplemented { text } => ("not implemented", text),
                    ArgminError::NotInitialized { text } => ("not initialized", text),
                    ArgminError::ConditionViolated { text } => ("condition violated", text),
                    ArgminError::CheckpointNotFound { text } => ("checkpoint not found", text),
                    ArgminError::PotentialBug { text } => ("potential bug", text),
                    ArgminError::ImpossibleError { text } => ("impossible error", text),
                    other => ("unclassified", other.to_string()),
                };
                OptError::Solver { kind, text }
            }
            Err(err) => OptError::Solver { kind: "backend", text: err.to_string() },
        }
    }
}

impl From<ForecastError> for OptError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::ThetaLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            ForecastError::InvalidThetaInput { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            other => OptError::ModelError { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Ensure an `OptError` that travelled through argmin's boxed error type
    // comes back out unchanged rather than being flattened into text.
    //
    // Given
    // -----
    // - `OptError::NonFiniteCost { value: NaN-free 1.0 }` converted into
    //   `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::from(err)` yields the original variant.
    fn from_argmin_error_recovers_wrapped_opt_error() {
        let wrapped: Error = OptError::NonFiniteCost { value: 1.0 }.into();

        assert_eq!(OptError::from(wrapped), OptError::NonFiniteCost { value: 1.0 });
    }

    #[test]
    // Purpose
    // -------
    // Verify that native argmin errors keep their class and message.
    //
    // Given
    // -----
    // - `ArgminError::NotInitialized` with a message.
    //
    // Expect
    // ------
    // - `OptError::Solver` tagged "not initialized" with the same message.
    fn from_argmin_error_maps_native_variants() {
        let err: Error = ArgminError::NotInitialized { text: "no param".to_string() }.into();

        assert_eq!(
            OptError::from(err),
            OptError::Solver { kind: "not initialized", text: "no param".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Check that forecasting-layer errors keep their structure when they carry
    // a direct optimizer counterpart, and fall back to text otherwise.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch` maps one-to-one.
    // - `ModelNotFitted` becomes `ModelError` with the display text.
    fn from_forecast_error_maps_structured_and_textual_variants() {
        let structured =
            OptError::from(ForecastError::ThetaLengthMismatch { expected: 3, actual: 2 });
        let textual = OptError::from(ForecastError::ModelNotFitted);

        assert_eq!(structured, OptError::ThetaLengthMismatch { expected: 3, actual: 2 });
        assert_eq!(
            textual,
            OptError::ModelError { text: ForecastError::ModelNotFitted.to_string() }
        );
    }
}
