//! High-level entry point for maximizing a [`LogLikelihood`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS and the line search chosen in `opts`.
///
/// Validates the starting point with `f.check`, wraps `(f, data)` in an
/// [`ArgMinAdapter`] (cost `-ℓ`), builds the solver, and runs it.
///
/// # Errors
/// - Anything returned by `f.check`.
/// - Solver construction and runtime errors, as [`OptError`] values.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use frac_forecast::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{maximize, LogLikelihood, MLEOptions, Theta},
/// };
///
/// struct Concave;
/// impl LogLikelihood for Concave {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Concave, array![0.1, -0.2], &(), &MLEOptions::default())?;
/// assert!(out.value <= 0.0);
/// # Ok::<(), frac_forecast::optimization::errors::OptError>(())
/// ```
///
/// [`OptError`]: crate::optimization::errors::OptError
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::{Cost, Tolerances},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // ℓ(θ) = -(θ₀ - 2)² - 3(θ₁ + 1)², maximized at (2, -1) with ℓ = 0.
    struct Quadratic;

    impl LogLikelihood for Quadratic {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            Ok(-(theta[0] - 2.0).powi(2) - 3.0 * (theta[1] + 1.0).powi(2))
        }

        fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
            }
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // End-to-end L-BFGS run with finite-difference gradients on a concave
    // quadratic, for both line searches.
    //
    // Expect
    // ------
    // - `theta_hat ≈ (2, -1)` and `value ≈ 0` (log-likelihood sign).
    fn maximize_finds_quadratic_peak_with_either_line_search() {
        for searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            let tols = Tolerances::new(Some(1e-8), None, Some(200)).expect("valid tolerances");
            let opts = MLEOptions::new(tols, searcher, None).expect("valid options");

            let out = maximize(&Quadratic, array![0.0, 0.0], &(), &opts).expect("solve succeeds");

            assert_relative_eq!(out.theta_hat[0], 2.0, epsilon = 1e-4);
            assert_relative_eq!(out.theta_hat[1], -1.0, epsilon = 1e-4);
            assert!(out.value <= 0.0 && out.value > -1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // `check` runs before the solver and its error is returned verbatim.
    fn maximize_propagates_check_failure() {
        let err = maximize(&Quadratic, array![0.0], &(), &MLEOptions::default()).unwrap_err();

        assert_eq!(err, OptError::ThetaLengthMismatch { expected: 2, actual: 1 });
    }
}
