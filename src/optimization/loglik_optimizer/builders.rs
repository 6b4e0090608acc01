//! loglik_optimizer::builders — L-BFGS solver construction.
//!
//! Builders apply the L-BFGS memory and the optional gradient / cost-change
//! tolerances from [`MLEOptions`]. The initial parameter vector and the
//! iteration cap are runtime concerns applied by
//! [`run_lbfgs`](super::run::run_lbfgs), so builders stay side-effect free.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search, configured from `opts`.
///
/// # Errors
/// - `OptError` (via `From<argmin::core::Error>`) if Argmin rejects a
///   tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search, configured from `opts`.
///
/// # Errors
/// - `OptError` (via `From<argmin::core::Error>`) if Argmin rejects a
///   tolerance.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply whichever of `tol_grad` / `tol_cost` is present; absent tolerances
/// keep Argmin's defaults.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};

    #[test]
    // Purpose
    // -------
    // Both builders accept default and explicit L-BFGS memory with valid
    // tolerances.
    fn builders_accept_default_and_explicit_memory() {
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).expect("valid tolerances");
        let default_mem =
            MLEOptions::new(tols, LineSearcher::HagerZhang, None).expect("valid options");
        let explicit_mem =
            MLEOptions::new(tols, LineSearcher::MoreThuente, Some(11)).expect("valid options");

        assert!(build_optimizer_hager_zhang(&default_mem).is_ok());
        assert!(build_optimizer_more_thuente(&explicit_mem).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // With only an iteration cap, `configure_lbfgs` leaves Argmin defaults in
    // place and still succeeds.
    fn configure_lbfgs_respects_absent_tolerances() {
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("valid tolerances");
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid options");

        assert!(configure_lbfgs(raw, &opts).is_ok());
    }
}
