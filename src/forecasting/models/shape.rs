//! Structure of a Gaussian-mixture HMM: number of hidden states and number
//! of mixture components per state.
//!
//! The observation dimension is fixed at 3 (`frac_change`, `frac_high`,
//! `frac_low`), so the shape alone determines the optimizer-space layout.
use crate::forecasting::{
    core::bars::Observation,
    errors::{ForecastError, ForecastResult},
};

/// GMM-HMM order.
///
/// - `n_components`: hidden states `K`.
/// - `n_mix`: Gaussian components per state `M`.
///
/// Invariant: both ≥ 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmmShape {
    pub n_components: usize,
    pub n_mix: usize,
}

impl HmmShape {
    /// # Errors
    /// - [`ForecastError::InvalidModelShape`] if either count is zero.
    pub fn new(n_components: usize, n_mix: usize) -> ForecastResult<Self> {
        if n_components == 0 {
            return Err(ForecastError::InvalidModelShape {
                param: "n_components",
                value: n_components,
                reason: "need at least one hidden state",
            });
        }
        if n_mix == 0 {
            return Err(ForecastError::InvalidModelShape {
                param: "n_mix",
                value: n_mix,
                reason: "need at least one mixture component per state",
            });
        }
        Ok(HmmShape { n_components, n_mix })
    }

    /// Offsets of each block in θ, in layout order
    /// `[start | transitions | mixture weights | means | raw stds]`.
    pub fn offsets(&self) -> ThetaOffsets {
        let k = self.n_components;
        let m = self.n_mix;
        let start = 0;
        let trans = start + k;
        let mix = trans + k * k;
        let means = mix + k * m;
        let stds = means + k * m * Observation::DIM;
        let end = stds + k * m * Observation::DIM;
        ThetaOffsets { start, trans, mix, means, stds, end }
    }

    /// Length of the unconstrained parameter vector.
    pub fn theta_len(&self) -> usize {
        self.offsets().end
    }
}

impl Default for HmmShape {
    fn default() -> Self {
        HmmShape { n_components: 4, n_mix: 5 }
    }
}

/// Block offsets into θ; `end` is the total length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThetaOffsets {
    pub start: usize,
    pub trans: usize,
    pub mix: usize,
    pub means: usize,
    pub stds: usize,
    pub end: usize,
}
