//! Execution helper that runs an `argmin` solver on a log-likelihood problem
//! and returns an [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
use tracing::debug;
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an L-BFGS solve for `problem` starting at `theta0`.
///
/// Wires the initial parameter (consumed), the optional iteration cap, and,
/// with the `obs_slog` feature and `opts.verbose`, Argmin's terminal
/// observer plus a one-off line reporting `ℓ(θ₀)`. The best state is
/// converted into an [`OptimOutcome`] with the sign flipped back to
/// log-likelihood space.
///
/// # Errors
/// - Any Argmin runtime error (line-search failure, cost error raised by the
///   model) normalized via `From<argmin::core::Error>`.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut state = optimizer.run()?.state().clone();
    let iterations = state.get_iter();
    let loglik = -state.get_best_cost();
    let termination = state.get_termination_status().clone();
    debug!(iterations, loglik, status = ?termination, "L-BFGS finished");

    let function_counts = state.get_func_counts().clone();
    let grad = state.take_gradient();
    OptimOutcome::new(
        state.take_best_param(),
        loglik,
        termination,
        iterations,
        function_counts,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    tracing::info!(loglik = ll0, grad_norm = ?g0n, dim = theta0.len(), "starting L-BFGS");
    Ok(())
}
