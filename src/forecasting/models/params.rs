//! GMM-HMM parameterization: model-space container and θ mapping.
//!
//! This module provides the **model-space** parameter container
//! [`HmmParams`] and the numerically stable mapping to and from the
//! **optimizer-space** vector θ (`ndarray::Array1<f64>`).
//!
//! ## Mapping conventions
//! - Start, transition, and mixture probabilities are stored as **logits**;
//!   each row is turned into log-probabilities with a max-shifted
//!   log-softmax, so every iterate is a valid distribution.
//! - Means are unconstrained and stored as-is.
//! - Standard deviations use `σ = softplus(θ) + min_std`, keeping every
//!   emission strictly positive however far the optimizer wanders.
//!
//! ## Layout
//! `θ = [start (K) | transitions (K·K, row-major) | mixture (K·M) |
//! means (K·M·3) | raw std (K·M·3)]`, see
//! [`HmmShape::offsets`](crate::forecasting::models::shape::HmmShape::offsets).
//!
//! ## Initialization
//! [`HmmParams::initial`] is deterministic: observations are ranked by
//! `frac_change` and split into `K` contiguous quantile groups, one per
//! state; mixture means spread around each group's mean by a fraction of
//! the sample std; stds start at the sample std; transitions are sticky.
use ndarray::{Array1, Array2, Array3, ArrayView1};

use crate::{
    forecasting::{
        core::bars::Observation,
        errors::{ForecastError, ForecastResult},
        models::shape::HmmShape,
    },
    optimization::numerical_stability::transformations::{
        log_softmax_into, safe_softplus, safe_softplus_inv,
    },
};

/// Probability mass kept on the diagonal of the initial transition matrix.
const STICKY_DIAG: f64 = 0.9;

/// Floor for the sample std used when seeding emissions.
const MIN_SEED_STD: f64 = 1e-3;

/// Validated model-space GMM-HMM parameters (log-probabilities, means, stds).
#[derive(Debug, Clone, PartialEq)]
pub struct HmmParams {
    /// `ln π_k`, length K.
    pub log_start: Array1<f64>,
    /// `ln A_{ij}`, shape K×K; rows normalize.
    pub log_trans: Array2<f64>,
    /// `ln w_{km}`, shape K×M; rows normalize.
    pub log_mix: Array2<f64>,
    /// Component means, shape K×M×3.
    pub means: Array3<f64>,
    /// Component stds, shape K×M×3, all `> min_std`.
    pub stds: Array3<f64>,
}

impl HmmParams {
    /// Build parameters from an optimizer-space θ.
    ///
    /// # Errors
    /// - [`ForecastError::ThetaLengthMismatch`] if `θ.len()` does not match
    ///   `shape`.
    /// - [`ForecastError::InvalidThetaInput`] for the first non-finite entry.
    pub fn from_theta(
        theta: ArrayView1<f64>, shape: &HmmShape, min_std: f64,
    ) -> ForecastResult<Self> {
        validate_theta(theta, shape)?;
        let k = shape.n_components;
        let m = shape.n_mix;
        let off = shape.offsets();
        let dim = Observation::DIM;

        let logits: Vec<f64> = (0..k).map(|i| theta[off.start + i]).collect();
        let mut start = vec![0.0; k];
        log_softmax_into(&logits, &mut start);
        let log_start = Array1::from(start);

        let mut log_trans = Array2::zeros((k, k));
        let mut log_mix = Array2::zeros((k, m));
        let mut row = vec![0.0; k.max(m)];
        for i in 0..k {
            let logits: Vec<f64> = (0..k).map(|j| theta[off.trans + i * k + j]).collect();
            log_softmax_into(&logits, &mut row[..k]);
            for j in 0..k {
                log_trans[[i, j]] = row[j];
            }
            let logits: Vec<f64> = (0..m).map(|j| theta[off.mix + i * m + j]).collect();
            log_softmax_into(&logits, &mut row[..m]);
            for j in 0..m {
                log_mix[[i, j]] = row[j];
            }
        }

        let mut means = Array3::zeros((k, m, dim));
        let mut stds = Array3::zeros((k, m, dim));
        for i in 0..k {
            for j in 0..m {
                for d in 0..dim {
                    let flat = (i * m + j) * dim + d;
                    means[[i, j, d]] = theta[off.means + flat];
                    stds[[i, j, d]] = safe_softplus(theta[off.stds + flat]) + min_std;
                }
            }
        }
        Ok(HmmParams { log_start, log_trans, log_mix, means, stds })
    }

    /// Map model-space parameters to optimizer-space θ.
    ///
    /// Log-probabilities are valid logits as they stand (log-softmax is
    /// idempotent on them). Stds are inverted through softplus after removing
    /// `min_std`, clamped away from zero so the inverse stays finite.
    pub fn to_theta(&self, shape: &HmmShape, min_std: f64) -> Array1<f64> {
        let k = shape.n_components;
        let m = shape.n_mix;
        let off = shape.offsets();
        let dim = Observation::DIM;
        let mut theta = Array1::zeros(off.end);
        for i in 0..k {
            theta[off.start + i] = self.log_start[i];
            for j in 0..k {
                theta[off.trans + i * k + j] = self.log_trans[[i, j]];
            }
            for j in 0..m {
                theta[off.mix + i * m + j] = self.log_mix[[i, j]];
                for d in 0..dim {
                    let flat = (i * m + j) * dim + d;
                    theta[off.means + flat] = self.means[[i, j, d]];
                    let excess = (self.stds[[i, j, d]] - min_std).max(1e-8);
                    theta[off.stds + flat] = safe_softplus_inv(excess);
                }
            }
        }
        theta
    }

    /// Deterministic data-driven starting point (see module docs).
    ///
    /// # Errors
    /// - [`ForecastError::EmptySeries`] if `data` is empty.
    pub fn initial(data: &[Observation], shape: &HmmShape, min_std: f64) -> ForecastResult<Self> {
        if data.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        let k = shape.n_components;
        let m = shape.n_mix;
        let dim = Observation::DIM;
        let n = data.len();

        let global_mean = column_means(data.iter());
        let global_std = column_stds(data.iter(), &global_mean);

        let mut ranked: Vec<&Observation> = data.iter().collect();
        ranked.sort_by(|a, b| a.frac_change.total_cmp(&b.frac_change));

        let mut means = Array3::zeros((k, m, dim));
        let mut stds = Array3::zeros((k, m, dim));
        for i in 0..k {
            let lo = i * n / k;
            let hi = ((i + 1) * n / k).max(lo);
            let group_mean = if hi > lo {
                column_means(ranked[lo..hi].iter().copied())
            } else {
                global_mean
            };
            for j in 0..m {
                let spread = j as f64 - (m as f64 - 1.0) / 2.0;
                for d in 0..dim {
                    let sd = global_std[d].max(MIN_SEED_STD);
                    means[[i, j, d]] = group_mean[d] + 0.25 * spread * sd;
                    stds[[i, j, d]] = sd.max(min_std * 2.0);
                }
            }
        }

        let uniform_k = -(k as f64).ln();
        let log_start = Array1::from_elem(k, uniform_k);
        let log_trans = if k == 1 {
            Array2::zeros((1, 1))
        } else {
            let off_diag = ((1.0 - STICKY_DIAG) / (k as f64 - 1.0)).ln();
            Array2::from_shape_fn((k, k), |(a, b)| if a == b { STICKY_DIAG.ln() } else { off_diag })
        };
        let log_mix = Array2::from_elem((k, m), -(m as f64).ln());
        Ok(HmmParams { log_start, log_trans, log_mix, means, stds })
    }
}

/// Check θ length and finiteness against `shape`.
pub fn validate_theta(theta: ArrayView1<f64>, shape: &HmmShape) -> ForecastResult<()> {
    let expected = shape.theta_len();
    if theta.len() != expected {
        return Err(ForecastError::ThetaLengthMismatch { expected, actual: theta.len() });
    }
    if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ForecastError::InvalidThetaInput { index, value });
    }
    Ok(())
}

fn column_means<'a>(obs: impl Iterator<Item = &'a Observation>) -> [f64; Observation::DIM] {
    let mut sum = [0.0; Observation::DIM];
    let mut n = 0usize;
    for o in obs {
        for (s, v) in sum.iter_mut().zip(o.as_array()) {
            *s += v;
        }
        n += 1;
    }
    if n > 0 {
        sum.iter_mut().for_each(|s| *s /= n as f64);
    }
    sum
}

fn column_stds<'a>(
    obs: impl Iterator<Item = &'a Observation>, mean: &[f64; Observation::DIM],
) -> [f64; Observation::DIM] {
    let mut ss = [0.0; Observation::DIM];
    let mut n = 0usize;
    for o in obs {
        for ((s, v), mu) in ss.iter_mut().zip(o.as_array()).zip(mean) {
            *s += (v - mu).powi(2);
        }
        n += 1;
    }
    if n > 0 {
        ss.iter_mut().for_each(|s| *s = (*s / n as f64).sqrt());
    }
    ss
}
