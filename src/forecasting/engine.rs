//! Forecast loop: one grid search per future step, with forecast-on-forecast
//! feedback.
//!
//! Purpose
//! -------
//! Drive a fitted [`SequenceModel`] through a test horizon: at every step,
//! score the whole candidate grid as continuations of the current window,
//! take the best candidate, turn it into a price, and feed that price
//! forward as the next step's reference.
//!
//! Key behaviors
//! -------------
//! - Initial state: window = last `d` training observations, reference
//!   price = first test open.
//! - Per step ([`Forecaster::step`]):
//!   1. regenerate the grid from [`GridSpec`](crate::forecasting::core::grid::GridSpec);
//!   2. score all candidates with the [`LikelihoodEvaluator`];
//!   3. select the strictly greatest score, lowest grid index on ties;
//!   4. push the winner into the window (oldest entry drops out);
//!   5. `predicted = frac_change · reference + reference`;
//!   6. record it and make it the next reference price.
//! - The true next open is never used. Errors compound by construction.
//! - Actual closes are read from the test bars only for the outcome; they
//!   never reach the window or the reference price.
//!
//! Invariants & assumptions
//! ------------------------
//! - The window holds exactly `d` observations before and after every step.
//! - A step with no valid candidate is fatal for the run; there is no
//!   fallback prediction.
//! - The loop itself is single-threaded; parallelism lives in the evaluator.
//!
//! Testing notes
//! -------------
//! - Unit tests use stub models with a known peak to pin down the selection,
//!   the price conversion, and the feedback of predictions into the
//!   reference price.
use std::time::Instant;

use ndarray::Array1;
use tracing::{debug, info};

use crate::forecasting::{
    core::{
        bars::{Observation, PriceBar, encode_bars},
        evaluator::{LikelihoodEvaluator, ScoredCandidate},
        grid::CandidateGrid,
        metrics::mean_abs_percent_error,
        options::ForecastOptions,
        window::ObservationWindow,
    },
    errors::{ForecastError, ForecastResult},
    models::traits::SequenceModel,
};

/// Mutable state of one forecast run.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastState {
    /// Open price the next candidate's fractional change applies to.
    pub reference_price: f64,
    pub window: ObservationWindow,
    pub predicted: Vec<f64>,
    /// Index of the next step.
    pub step: usize,
}

impl ForecastState {
    /// # Errors
    /// - [`ForecastError::InsufficientHistory`] / [`ForecastError::InvalidLatency`]
    ///   from seeding the window.
    /// - [`ForecastError::NonPositiveOpen`] if `reference_price` is not a
    ///   finite positive number.
    pub fn new(
        history: &[Observation], reference_price: f64, latency: usize,
    ) -> ForecastResult<Self> {
        if !reference_price.is_finite() || reference_price <= 0.0 {
            return Err(ForecastError::NonPositiveOpen { index: 0, value: reference_price });
        }
        let window = ObservationWindow::from_tail(history, latency)?;
        Ok(ForecastState { reference_price, window, predicted: Vec::new(), step: 0 })
    }
}

/// What happened in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDiagnostics {
    pub step: usize,
    pub winner: ScoredCandidate,
    pub reference_price: f64,
    pub predicted: f64,
    pub scored: usize,
    pub failed: usize,
}

/// Result of a full run: paired predicted/actual closes plus per-step detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub predicted: Array1<f64>,
    pub actual: Array1<f64>,
    pub final_window: Vec<Observation>,
    pub steps: Vec<StepDiagnostics>,
}

impl ForecastOutcome {
    /// Mean absolute percentage error of `predicted` against `actual`.
    pub fn mape(&self) -> ForecastResult<f64> {
        mean_abs_percent_error(self.predicted.view(), self.actual.view())
    }
}

/// Runs the forecast loop for a fitted model.
///
/// The evaluator (and its worker pool) is built once and reused for every
/// step and every run of this forecaster.
#[derive(Debug)]
pub struct Forecaster<'m, M: SequenceModel + ?Sized> {
    model: &'m M,
    options: ForecastOptions,
    evaluator: LikelihoodEvaluator,
}

impl<'m, M: SequenceModel + ?Sized> Forecaster<'m, M> {
    /// # Errors
    /// - [`ForecastError::ThreadPool`] if the evaluator's pool cannot start.
    pub fn new(model: &'m M, options: ForecastOptions) -> ForecastResult<Self> {
        let evaluator = LikelihoodEvaluator::new(options.evaluator)?;
        Ok(Forecaster { model, options, evaluator })
    }

    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Seed the state from training observations and the first test open.
    ///
    /// # Errors
    /// - [`ForecastError::EmptySeries`] if `test_bars` is empty.
    /// - Window seeding errors, see [`ForecastState::new`].
    pub fn initial_state(
        &self, train_obs: &[Observation], test_bars: &[PriceBar],
    ) -> ForecastResult<ForecastState> {
        let first = test_bars.first().ok_or(ForecastError::EmptySeries)?;
        ForecastState::new(train_obs, first.open, self.options.latency)
    }

    /// Advance `state` by one step.
    ///
    /// # Errors
    /// - [`ForecastError::ModelNotFitted`] if the model cannot score yet.
    /// - [`ForecastError::NoValidCandidates`] or
    ///   [`ForecastError::StepDeadlineExceeded`] from the evaluator. `state`
    ///   is left untouched on error.
    pub fn step(&self, state: &mut ForecastState) -> ForecastResult<StepDiagnostics> {
        if !self.model.is_fitted() {
            return Err(ForecastError::ModelNotFitted);
        }
        let step = state.step;
        let grid = CandidateGrid::generate(&self.options.grid);
        let evaluation = self.evaluator.evaluate(self.model, &state.window, &grid, step)?;
        let winner = *evaluation.best().ok_or(ForecastError::NoValidCandidates { step })?;

        let reference_price = state.reference_price;
        let predicted = winner.observation.implied_close(reference_price);
        state.window.push(winner.observation);
        state.predicted.push(predicted);
        state.reference_price = predicted;
        state.step += 1;

        debug!(
            step,
            grid_index = winner.index,
            frac_change = winner.observation.frac_change,
            log_lik = winner.log_lik,
            reference_price,
            predicted,
            failed = evaluation.failed,
            "forecast step"
        );
        Ok(StepDiagnostics {
            step,
            winner,
            reference_price,
            predicted,
            scored: evaluation.scored.len(),
            failed: evaluation.failed,
        })
    }

    /// Forecast one close per test bar.
    ///
    /// # Errors
    /// - [`ForecastError::ModelNotFitted`] before any work is done.
    /// - Bar validation errors for `test_bars`.
    /// - Any step error; the run stops at the first one.
    pub fn run(
        &self, train_obs: &[Observation], test_bars: &[PriceBar],
    ) -> ForecastResult<ForecastOutcome> {
        if !self.model.is_fitted() {
            return Err(ForecastError::ModelNotFitted);
        }
        encode_bars(test_bars)?;
        let started = Instant::now();
        let mut state = self.initial_state(train_obs, test_bars)?;
        let mut steps = Vec::with_capacity(test_bars.len());
        for _ in test_bars {
            steps.push(self.step(&mut state)?);
        }

        let outcome = ForecastOutcome {
            predicted: Array1::from(state.predicted),
            actual: test_bars.iter().map(|b| b.close).collect(),
            final_window: state.window.to_vec(),
            steps,
        };
        info!(
            steps = outcome.steps.len(),
            latency = self.options.latency,
            candidates = self.options.grid.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            mape = outcome.mape().ok(),
            "forecast complete"
        );
        Ok(outcome)
    }
}

/// Encode `train_bars`, fit `model` on them, and return the observations.
///
/// The returned observations seed the forecast window.
pub fn train<M: SequenceModel + ?Sized>(
    model: &mut M, train_bars: &[PriceBar],
) -> ForecastResult<Vec<Observation>> {
    let observations = encode_bars(train_bars)?;
    let started = Instant::now();
    model.fit(&observations)?;
    info!(
        n_obs = observations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "model trained"
    );
    Ok(observations)
}
