//! optimization — MLE stack, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used to fit sequence models: an
//! Argmin-backed log-likelihood optimizer, numerically stable transforms for
//! mapping unconstrained parameters into probability simplices and positive
//! scales, and a single error/result surface. Callers implement a
//! log-likelihood, choose tolerances, and obtain fitted parameters and
//! diagnostics without touching backend solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing log-likelihoods** `ℓ(θ)`
//!   (`loglik_optimizer`), including configuration of solvers and stopping
//!   criteria.
//! - Supply shared numerical primitives (`numerical_stability`): softplus,
//!   max-shifted log-softmax, and log-sum-exp.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained parameter space `θ` and assume
//!   that inputs are finite once validation has passed; invalid states are
//!   reported as `OptError`, not panics.
//! - Log-likelihood implementations treat domain violations (wrong θ length,
//!   non-finite entries, degenerate emissions) as recoverable errors surfaced
//!   through the optimization layer.
//!
//! Conventions
//! -----------
//! - All solvers conceptually maximize a log-likelihood `ℓ(θ)` by minimizing
//!   an internal cost `c(θ) = -ℓ(θ)`; user-facing APIs and outcomes are
//!   expressed in terms of `ℓ`.
//! - Parameters and gradients are `ndarray`-based aliases (`Theta`, `Grad`);
//!   mapping between θ-space and structured model parameters (e.g. HMM
//!   transition rows) is handled by the model layer using
//!   `numerical_stability` helpers.
//! - No I/O. A finished solve is reported with a `tracing::debug!` event; the
//!   optional `obs_slog` feature also attaches Argmin's terminal observer
//!   when verbose output is requested.
//!
//! Downstream usage
//! ----------------
//! - Model code implements `LogLikelihood` for its types and calls
//!   `maximize` with a parameter guess, data payload, and `MLEOptions` to
//!   obtain an `OptimOutcome` (via `loglik_optimizer`).
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules focus on local concerns: solver wiring and
//!   tolerance handling (`loglik_optimizer`), agreement with naïve formulas
//!   (`numerical_stability`), and error conversions (`errors`).
//! - The GMM-HMM fit tests exercise `maximize` end to end with
//!   finite-difference gradients.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use frac_forecast::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
