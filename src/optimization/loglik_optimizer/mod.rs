//! loglik_optimizer — argmin-powered log-likelihood maximization.
//!
//! Purpose
//! -------
//! Fit sequence models by maximum likelihood. Models implement a single
//! trait, [`LogLikelihood`], and call [`maximize`] to run L-BFGS with a
//! configurable line search, tolerances, and finite-difference gradients when
//! no analytic gradient exists (the GMM-HMM backend relies on this).
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the Argmin cost
//!   `c(θ) = -ℓ(θ)` and differentiates it numerically when needed.
//! - [`maximize`] validates the start point via [`LogLikelihood::check`],
//!   builds the solver ([`builders`]), runs it ([`run::run_lbfgs`]), and
//!   normalizes results into an [`OptimOutcome`].
//! - Configuration ([`Tolerances`], [`MLEOptions`]) is validated on
//!   construction ([`validation`]).
//!
//! Conventions
//! -----------
//! - Parameters live in unconstrained space as [`Theta`] (`Array1<f64>`);
//!   mapping to constrained model parameters happens in the model layer.
//! - All user-facing values (including [`OptimOutcome::value`]) are
//!   log-likelihoods, never costs.
//! - Errors bubble up as [`OptResult<T>`](crate::optimization::errors::OptResult).
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign conventions and finite differences ([`adapter`]),
//!   solver construction ([`builders`]), configuration invariants
//!   ([`traits`]), and a full solve on a concave quadratic ([`api`]).

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
