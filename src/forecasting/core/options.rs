//! Forecast options: configuration for the search and the forecast loop.
//!
//! Purpose
//! -------
//! Collect the knobs of a forecast run in one place: the latency depth of the
//! observation window, the candidate grid, and how candidate scoring is fanned
//! out across workers.
//!
//! Key behaviors
//! -------------
//! - [`EvaluatorOptions`] controls the parallel evaluator: number of
//!   contiguous chunks, worker pool size (independent of the chunk count),
//!   and an optional per-step deadline.
//! - [`ForecastOptions`] bundles the latency depth, a [`GridSpec`], and the
//!   evaluator options for [`Forecaster`](crate::forecasting::engine::Forecaster).
//!
//! Invariants & assumptions
//! ------------------------
//! - `latency ≥ 1`, `chunk_count ≥ 1`, `workers ≥ 1` when given, and a
//!   deadline is non-zero when given; all enforced by the `new` constructors.
//! - [`GridSpec`] axes are validated by
//!   [`GridAxis::new`](crate::forecasting::core::grid::GridAxis::new); this
//!   module does not re-check them.
//!
//! Conventions
//! -----------
//! - Defaults reproduce the reference behavior: latency 10, 20 chunks, the
//!   5000-point grid, one worker per available core, no deadline.
//! - Chunk count is a tuning constant; it never changes which candidates are
//!   scored or which one wins.
//!
//! Testing notes
//! -------------
//! - Unit tests check defaults and each rejected value.
use std::time::Duration;

use crate::forecasting::{
    core::grid::GridSpec,
    errors::{ForecastError, ForecastResult},
};

/// Default latency depth `d`.
pub const DEFAULT_LATENCY: usize = 10;

/// Default number of contiguous chunks the grid is split into per step.
pub const DEFAULT_CHUNK_COUNT: usize = 20;

/// EvaluatorOptions — fan-out configuration for candidate scoring.
///
/// Fields
/// ------
/// - `chunk_count`: `usize`
///   Number of contiguous chunks of size `ceil(n / chunk_count)`.
/// - `workers`: `Option<usize>`
///   Size of the evaluator's thread pool; `None` uses rayon's default (the
///   machine's available parallelism).
/// - `deadline`: `Option<Duration>`
///   Per-step wall-clock budget. Workers check it before each candidate, and
///   an exceeded budget fails the step. An in-flight `score` call is not
///   interrupted, so the step returns only after it finishes; a `score` that
///   never returns blocks the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorOptions {
    pub chunk_count: usize,
    pub workers: Option<usize>,
    pub deadline: Option<Duration>,
}

impl EvaluatorOptions {
    /// Validate and build evaluator options.
    ///
    /// # Errors
    /// - [`ForecastError::InvalidChunkCount`] if `chunk_count == 0`.
    /// - [`ForecastError::InvalidWorkerCount`] if `workers == Some(0)`.
    /// - [`ForecastError::InvalidDeadline`] if `deadline == Some(Duration::ZERO)`.
    pub fn new(
        chunk_count: usize, workers: Option<usize>, deadline: Option<Duration>,
    ) -> ForecastResult<Self> {
        if chunk_count == 0 {
            return Err(ForecastError::InvalidChunkCount {
                count: chunk_count,
                reason: "chunk count must be at least 1",
            });
        }
        if let Some(0) = workers {
            return Err(ForecastError::InvalidWorkerCount {
                workers: 0,
                reason: "worker count must be at least 1",
            });
        }
        if let Some(d) = deadline {
            if d.is_zero() {
                return Err(ForecastError::InvalidDeadline { reason: "deadline must be non-zero" });
            }
        }
        Ok(EvaluatorOptions { chunk_count, workers, deadline })
    }
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        EvaluatorOptions { chunk_count: DEFAULT_CHUNK_COUNT, workers: None, deadline: None }
    }
}

/// ForecastOptions — configuration of one forecast run.
///
/// Purpose
/// -------
/// Carry everything the forecast loop needs besides the model and the data.
///
/// Fields
/// ------
/// - `latency`: `usize`
///   Depth `d` of the observation window.
/// - `grid`: [`GridSpec`]
///   Axes of the candidate grid regenerated every step.
/// - `evaluator`: [`EvaluatorOptions`]
///   Parallel scoring configuration.
///
/// Invariants
/// ----------
/// - `latency ≥ 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastOptions {
    pub latency: usize,
    pub grid: GridSpec,
    pub evaluator: EvaluatorOptions,
}

impl ForecastOptions {
    /// # Errors
    /// - [`ForecastError::InvalidLatency`] if `latency == 0`.
    pub fn new(
        latency: usize, grid: GridSpec, evaluator: EvaluatorOptions,
    ) -> ForecastResult<Self> {
        if latency == 0 {
            return Err(ForecastError::InvalidLatency {
                latency,
                reason: "latency must be at least 1",
            });
        }
        Ok(ForecastOptions { latency, grid, evaluator })
    }
}

impl Default for ForecastOptions {
    fn default() -> Self {
        ForecastOptions {
            latency: DEFAULT_LATENCY,
            grid: GridSpec::default(),
            evaluator: EvaluatorOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults match the reference run configuration.
    fn defaults_match_reference_configuration() {
        let opts = ForecastOptions::default();

        assert_eq!(opts.latency, 10);
        assert_eq!(opts.evaluator.chunk_count, 20);
        assert_eq!(opts.evaluator.workers, None);
        assert_eq!(opts.evaluator.deadline, None);
        assert_eq!(opts.grid.size(), 5000);
    }

    #[test]
    fn constructors_reject_zero_values() {
        assert!(matches!(
            ForecastOptions::new(0, GridSpec::default(), EvaluatorOptions::default()),
            Err(ForecastError::InvalidLatency { latency: 0, .. })
        ));
        assert!(matches!(
            EvaluatorOptions::new(0, None, None),
            Err(ForecastError::InvalidChunkCount { count: 0, .. })
        ));
        assert!(matches!(
            EvaluatorOptions::new(4, Some(0), None),
            Err(ForecastError::InvalidWorkerCount { workers: 0, .. })
        ));
        assert!(matches!(
            EvaluatorOptions::new(4, Some(2), Some(Duration::ZERO)),
            Err(ForecastError::InvalidDeadline { .. })
        ));
    }

    #[test]
    fn new_preserves_valid_inputs() {
        let ev = EvaluatorOptions::new(7, Some(3), Some(Duration::from_secs(5))).expect("valid");
        let opts = ForecastOptions::new(2, GridSpec::default(), ev).expect("valid");

        assert_eq!(opts.latency, 2);
        assert_eq!(opts.evaluator, ev);
    }
}
