//! numerical_stability — numerically robust transformations.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar and vector transforms used when mapping
//! unconstrained optimizer parameters into model space (positive scales,
//! probability simplices) and when accumulating probabilities in log space.
//!
//! Key behaviors
//! -------------
//! - Provide stable scalar transforms (`safe_softplus` and its inverse) for
//!   mapping unconstrained reals into strictly positive scales.
//! - Provide `log_sum_exp` and `log_softmax_into` for forward recursions and
//!   for turning logits into log-probability rows.
//!
//! Conventions
//! -----------
//! - All public transforms assume finite `f64` inputs unless documented
//!   otherwise (`log_sum_exp` accepts `-∞`).
//! - This module never logs, performs I/O, or touches global state; it is
//!   pure numerical helpers suitable for use inside tight inner loops.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover agreement with naïve formulas on
//!   safe grids, overflow behavior, and probability mass conservation.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    log_softmax_into, log_sum_exp, safe_softplus, safe_softplus_inv,
};

pub mod prelude {
    pub use super::transformations::{
        log_softmax_into, log_sum_exp, safe_softplus, safe_softplus_inv,
    };
}
