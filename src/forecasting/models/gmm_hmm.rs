//! Gaussian-mixture hidden Markov model over normalized observations.
//!
//! This module wires a K-state HMM with M diagonal-Gaussian mixture
//! components per state to both the [`LogLikelihood`] trait (for fitting) and
//! the [`SequenceModel`] trait (for forecasting).
//!
//! Key ideas:
//! - Parameters live in unconstrained space (see
//!   [`params`](crate::forecasting::models::params)); each likelihood
//!   evaluation decodes θ into log-probabilities, means, and stds.
//! - The sequence log-likelihood is the forward algorithm in log space,
//!   `α₀(j) = ln π_j + ln b_j(x₀)`,
//!   `α_t(j) = LSE_i(α_{t−1}(i) + ln A_{ij}) + ln b_j(x_t)`,
//!   `ℓ = LSE_j α_{T−1}(j)`.
//! - Emissions are `ln b_j(x) = LSE_m(ln w_{jm} + Σ_d ln N(x_d; μ_{jmd}, σ_{jmd}))`
//!   with `statrs` univariate normals.
//! - There is no analytic gradient; the optimizer falls back to finite
//!   differences of the cost.
use statrs::distribution::{Continuous, Normal};
use tracing::info;

use crate::{
    forecasting::{
        core::bars::Observation,
        errors::{ForecastError, ForecastResult},
        models::{
            params::{HmmParams, validate_theta},
            shape::HmmShape,
            traits::SequenceModel,
        },
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::{LogLikelihood, MLEOptions, OptimOutcome, Theta, maximize},
        numerical_stability::transformations::log_sum_exp,
    },
};

/// Default floor added to every emission std.
pub const DEFAULT_MIN_STD: f64 = 1e-4;

/// Estimation-time configuration for [`GmmHmm`].
///
/// - `mle_opts`: optimizer configuration for L-BFGS.
/// - `min_std`: floor added to every emission std (`σ = softplus(θ) + min_std`).
#[derive(Debug, Clone, PartialEq)]
pub struct HmmOptions {
    pub mle_opts: MLEOptions,
    pub min_std: f64,
}

impl HmmOptions {
    /// # Errors
    /// - [`ForecastError::InvalidMinStd`] unless `min_std` is finite and > 0.
    pub fn new(mle_opts: MLEOptions, min_std: f64) -> ForecastResult<Self> {
        if !min_std.is_finite() || min_std <= 0.0 {
            return Err(ForecastError::InvalidMinStd { value: min_std });
        }
        Ok(HmmOptions { mle_opts, min_std })
    }
}

impl Default for HmmOptions {
    fn default() -> Self {
        HmmOptions { mle_opts: MLEOptions::default(), min_std: DEFAULT_MIN_STD }
    }
}

/// GMM-HMM with diagonal covariances.
///
/// After [`SequenceModel::fit`], `results` holds the optimizer outcome and
/// `fitted_params` the decoded parameters used by `score`.
#[derive(Debug, Clone, PartialEq)]
pub struct GmmHmm {
    pub shape: HmmShape,
    pub options: HmmOptions,
    pub results: Option<OptimOutcome>,
    pub fitted_params: Option<HmmParams>,
}

impl GmmHmm {
    pub fn new(shape: HmmShape, options: HmmOptions) -> GmmHmm {
        GmmHmm { shape, options, results: None, fitted_params: None }
    }

    /// A ready-to-score model with known parameters, skipping estimation.
    pub fn from_params(shape: HmmShape, options: HmmOptions, params: HmmParams) -> GmmHmm {
        GmmHmm { shape, options, results: None, fitted_params: Some(params) }
    }

    /// Deterministic starting θ for `data`.
    pub fn initial_theta(&self, data: &[Observation]) -> ForecastResult<Theta> {
        let params = HmmParams::initial(data, &self.shape, self.options.min_std)?;
        Ok(params.to_theta(&self.shape, self.options.min_std))
    }

    /// Fit by maximum likelihood from `theta0` (consumed) and cache results.
    ///
    /// ## Steps
    /// 1. Run L-BFGS per `options.mle_opts`, moving `theta0` into the executor.
    /// 2. Decode `theta_hat` into [`HmmParams`].
    /// 3. Store both the outcome and the decoded parameters.
    ///
    /// ## Errors
    /// - Optimizer failures as [`ForecastError::OptimizationFailed`];
    ///   θ shape problems keep their structured variants.
    pub fn fit_from(&mut self, theta0: Theta, data: &[Observation]) -> ForecastResult<()> {
        let data = data.to_vec();
        let outcome = maximize(&*self, theta0, &data, &self.options.mle_opts)?;
        let params =
            HmmParams::from_theta(outcome.theta_hat.view(), &self.shape, self.options.min_std)?;
        info!(
            n_components = self.shape.n_components,
            n_mix = self.shape.n_mix,
            n_obs = data.len(),
            loglik = outcome.value,
            iterations = outcome.iterations,
            converged = outcome.converged,
            "fitted GMM-HMM"
        );
        self.results = Some(outcome);
        self.fitted_params = Some(params);
        Ok(())
    }
}

impl LogLikelihood for GmmHmm {
    type Data = Vec<Observation>;

    /// Forward-algorithm log-likelihood of `data` at θ.
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        let params = HmmParams::from_theta(theta.view(), &self.shape, self.options.min_std)?;
        Ok(forward_log_likelihood(&params, data)?)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        validate_theta(theta.view(), &self.shape)?;
        if data.is_empty() {
            return Err(ForecastError::EmptySeries.into());
        }
        Ok(())
    }
}

impl SequenceModel for GmmHmm {
    /// Seed θ deterministically from `data` and fit.
    ///
    /// # Errors
    /// - [`ForecastError::EmptySeries`] for an empty history.
    /// - [`ForecastError::NonFiniteBar`] if an observation has a NaN/±inf
    ///   component (reported against the observation index).
    fn fit(&mut self, data: &[Observation]) -> ForecastResult<()> {
        if data.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        for (index, obs) in data.iter().enumerate() {
            let fields = ["frac_change", "frac_high", "frac_low"];
            if let Some((field, value)) =
                fields.into_iter().zip(obs.as_array()).find(|(_, v)| !v.is_finite())
            {
                return Err(ForecastError::NonFiniteBar { index, field, value });
            }
        }
        let theta0 = self.initial_theta(data)?;
        self.fit_from(theta0, data)
    }

    fn score(&self, sequence: &[Observation]) -> ForecastResult<f64> {
        let params = self.fitted_params.as_ref().ok_or(ForecastError::ModelNotFitted)?;
        forward_log_likelihood(params, sequence)
    }

    fn is_fitted(&self) -> bool {
        self.fitted_params.is_some()
    }
}

/// Log-likelihood of `sequence` under `params` (forward algorithm).
///
/// # Errors
/// - [`ForecastError::EmptySeries`] if `sequence` is empty.
/// - [`ForecastError::InvalidEmission`] if a component cannot be built.
pub fn forward_log_likelihood(params: &HmmParams, sequence: &[Observation]) -> ForecastResult<f64> {
    let (first, rest) = sequence.split_first().ok_or(ForecastError::EmptySeries)?;
    let k = params.log_start.len();
    let mut comp = vec![0.0; params.log_mix.ncols()];
    let mut emit = vec![0.0; k];
    let mut alpha = vec![0.0; k];
    let mut next = vec![0.0; k];
    let mut terms = vec![0.0; k];

    emissions_into(params, first, &mut comp, &mut emit)?;
    for j in 0..k {
        alpha[j] = params.log_start[j] + emit[j];
    }
    for x in rest {
        emissions_into(params, x, &mut comp, &mut emit)?;
        for j in 0..k {
            for i in 0..k {
                terms[i] = alpha[i] + params.log_trans[[i, j]];
            }
            next[j] = log_sum_exp(&terms) + emit[j];
        }
        std::mem::swap(&mut alpha, &mut next);
    }
    Ok(log_sum_exp(&alpha))
}

/// `ln b_state(x)` for a single state.
pub fn emission_log_density(
    params: &HmmParams, state: usize, x: &Observation,
) -> ForecastResult<f64> {
    let mut comp = vec![0.0; params.log_mix.ncols()];
    state_emission(params, state, x, &mut comp)
}

fn emissions_into(
    params: &HmmParams, x: &Observation, comp: &mut [f64], out: &mut [f64],
) -> ForecastResult<()> {
    for (state, slot) in out.iter_mut().enumerate() {
        *slot = state_emission(params, state, x, comp)?;
    }
    Ok(())
}

fn state_emission(
    params: &HmmParams, state: usize, x: &Observation, comp: &mut [f64],
) -> ForecastResult<f64> {
    let values = x.as_array();
    for (m, slot) in comp.iter_mut().enumerate() {
        let mut acc = params.log_mix[[state, m]];
        for (d, &v) in values.iter().enumerate() {
            let normal = Normal::new(params.means[[state, m, d]], params.stds[[state, m, d]])?;
            acc += normal.ln_pdf(v);
        }
        *slot = acc;
    }
    Ok(log_sum_exp(comp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::{LineSearcher, Tolerances};
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, Array3};

    fn obs_seq() -> Vec<Observation> {
        vec![
            Observation::new(0.01, 0.02, 0.005),
            Observation::new(-0.02, 0.01, 0.03),
            Observation::new(0.004, 0.015, 0.01),
        ]
    }

    fn two_state_params() -> HmmParams {
        let log_start = Array1::from(vec![0.3f64.ln(), 0.7f64.ln()]);
        let log_trans = Array2::from_shape_vec((2, 2), vec![0.8, 0.2, 0.4, 0.6])
            .expect("2x2")
            .mapv(f64::ln);
        let log_mix = Array2::from_shape_vec((2, 2), vec![0.5, 0.5, 0.9, 0.1])
            .expect("2x2")
            .mapv(f64::ln);
        let means = Array3::from_shape_fn((2, 2, 3), |(k, m, d)| {
            0.01 * (k as f64 - 0.5) + 0.005 * m as f64 + 0.002 * d as f64
        });
        let stds = Array3::from_shape_fn((2, 2, 3), |(k, m, d)| {
            0.01 + 0.005 * k as f64 + 0.002 * m as f64 + 0.001 * d as f64
        });
        HmmParams { log_start, log_trans, log_mix, means, stds }
    }

    #[test]
    // Purpose
    // -------
    // The log-space forward recursion equals brute-force summation over all
    // hidden paths.
    //
    // Given
    // -----
    // - K = 2, M = 2 hand-set parameters; a length-3 sequence (8 paths).
    //
    // Expect
    // ------
    // - ℓ = ln Σ_paths π_{s0} b_{s0}(x0) Π A_{s(t−1) s(t)} b_{s(t)}(x_t).
    fn forward_matches_path_enumeration() {
        let params = two_state_params();
        let seq = obs_seq();

        let ll = forward_log_likelihood(&params, &seq).expect("valid params");

        let b = |s: usize, t: usize| {
            emission_log_density(&params, s, &seq[t]).expect("valid params").exp()
        };
        let mut total = 0.0;
        for s0 in 0..2 {
            for s1 in 0..2 {
                for s2 in 0..2 {
                    total += params.log_start[s0].exp()
                        * b(s0, 0)
                        * params.log_trans[[s0, s1]].exp()
                        * b(s1, 1)
                        * params.log_trans[[s1, s2]].exp()
                        * b(s2, 2);
                }
            }
        }
        assert_relative_eq!(ll, total.ln(), epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // With one state and one component the model is an i.i.d. diagonal
    // Gaussian, so ℓ is a plain sum of univariate log-densities.
    fn single_state_reduces_to_iid_gaussian() {
        let means = Array3::from_shape_vec((1, 1, 3), vec![0.0, 0.01, 0.01]).expect("1x1x3");
        let stds = Array3::from_shape_vec((1, 1, 3), vec![0.02, 0.01, 0.015]).expect("1x1x3");
        let params = HmmParams {
            log_start: Array1::zeros(1),
            log_trans: Array2::zeros((1, 1)),
            log_mix: Array2::zeros((1, 1)),
            means: means.clone(),
            stds: stds.clone(),
        };
        let seq = obs_seq();

        let ll = forward_log_likelihood(&params, &seq).expect("valid params");

        let mut expected = 0.0;
        for x in &seq {
            for (d, v) in x.as_array().iter().enumerate() {
                let n = Normal::new(means[[0, 0, d]], stds[[0, 0, d]]).expect("valid normal");
                expected += n.ln_pdf(*v);
            }
        }
        assert_relative_eq!(ll, expected, epsilon = 1e-10);
    }

    #[test]
    fn score_requires_fitted_model_and_non_empty_sequence() {
        let unfitted = GmmHmm::new(HmmShape::default(), HmmOptions::default());
        let shape = HmmShape::new(2, 2).expect("valid");
        let fitted = GmmHmm::from_params(shape, HmmOptions::default(), two_state_params());

        assert!(!unfitted.is_fitted());
        assert_eq!(unfitted.score(&obs_seq()).unwrap_err(), ForecastError::ModelNotFitted);
        assert!(fitted.is_fitted());
        assert_eq!(fitted.score(&[]).unwrap_err(), ForecastError::EmptySeries);
    }

    #[test]
    fn invalid_emission_std_is_reported() {
        let mut params = two_state_params();
        params.stds[[1, 0, 2]] = 0.0;

        let err = forward_log_likelihood(&params, &obs_seq()).unwrap_err();

        assert!(matches!(err, ForecastError::InvalidEmission { .. }));
    }

    #[test]
    // Purpose
    // -------
    // A short L-BFGS run never ends below the starting log-likelihood and
    // leaves the model ready to score.
    //
    // Given
    // -----
    // - K = 2, M = 1 on 60 synthetic observations; 5 iterations.
    //
    // Expect
    // ------
    // - `ℓ(θ̂) ≥ ℓ(θ₀)`; `is_fitted()`; finite scores.
    fn fit_improves_on_initial_loglik() {
        let data: Vec<Observation> = (0..60)
            .map(|i| {
                let x = (i as f64 * 1.3).sin();
                Observation::new(0.015 * x, 0.01 + 0.004 * x.abs(), 0.012 - 0.003 * x)
            })
            .collect();
        let tols = Tolerances::new(Some(1e-6), None, Some(5)).expect("valid tolerances");
        let mle_opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid");
        let options = HmmOptions::new(mle_opts, DEFAULT_MIN_STD).expect("valid");
        let mut model = GmmHmm::new(HmmShape::new(2, 1).expect("valid"), options);
        let theta0 = model.initial_theta(&data).expect("non-empty");
        let ll0 = model.value(&theta0, &data).expect("finite");

        model.fit(&data).expect("fit succeeds");

        let outcome = model.results.as_ref().expect("results stored");
        assert!(outcome.value >= ll0 - 1e-9);
        assert!(model.is_fitted());
        assert!(model.score(&data[..11]).expect("scores").is_finite());
    }

    #[test]
    fn options_reject_bad_min_std() {
        assert_eq!(
            HmmOptions::new(MLEOptions::default(), 0.0).unwrap_err(),
            ForecastError::InvalidMinStd { value: 0.0 }
        );
        assert!(HmmOptions::new(MLEOptions::default(), f64::NAN).is_err());
    }
}
