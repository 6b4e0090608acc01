//! forecasting — fractional-change price forecasting by likelihood grid search.
//!
//! Purpose
//! -------
//! Forecast daily closing prices from a sequence model trained on fractional
//! bar changes. Every future day is predicted by scoring a discretized grid
//! of candidate observations as continuations of a rolling window and
//! keeping the most likely one. Predictions feed back as the next day's
//! reference price, so the forecast is multi-step with no peeking at the
//! true opens.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the building blocks: bar encoding ([`PriceBar`] →
//!   [`Observation`]), the candidate grid, the rolling window, the parallel
//!   [`LikelihoodEvaluator`], run options and the MAPE metric.
//! - [`models`] defines the [`SequenceModel`] capability and the
//!   Gaussian-mixture HMM backend [`GmmHmm`], fitted by L-BFGS through
//!   [`crate::optimization`].
//! - [`engine`] runs the forecast loop ([`Forecaster`]) and the training
//!   helper [`train`].
//! - [`io`] connects the loop to collaborators: [`PriceSource`] for input
//!   bars and [`ForecastReporter`] for results.
//! - [`errors`] centralizes [`ForecastError`] / [`ForecastResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Bars have finite, strictly positive opens; fractions are relative to
//!   the open of the same bar.
//! - The candidate grid is regenerated identically every step and indexed
//!   with the change axis varying fastest.
//! - Candidate selection is independent of worker count and chunking: the
//!   strictly greatest log-likelihood wins and ties go to the lowest grid
//!   index.
//!
//! Downstream usage
//! ----------------
//! 1. Load bars with a [`PriceSource`] (e.g. [`CsvPriceSource`]).
//! 2. Build a [`GmmHmm`] and call [`train`] on the training bars.
//! 3. Build a [`Forecaster`] with [`ForecastOptions`] and `run` it on the
//!    test bars.
//! 4. Read [`ForecastOutcome::mape`] and optionally [`publish`] the outcome.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/integration_forecast_pipeline.rs`
//!   covers the whole flow from CSV files to a written report.
pub mod core;
pub mod engine;
pub mod errors;
pub mod io;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    bars::{Observation, PriceBar, encode_bars},
    evaluator::{Evaluation, LikelihoodEvaluator, ScoredCandidate},
    grid::{CandidateGrid, GridAxis, GridSpec},
    metrics::mean_abs_percent_error,
    options::{EvaluatorOptions, ForecastOptions},
    window::ObservationWindow,
};
pub use self::engine::{ForecastOutcome, ForecastState, Forecaster, StepDiagnostics, train};
pub use self::errors::{ForecastError, ForecastResult};
pub use self::io::{CsvPriceSource, CsvReporter, ForecastReporter, PriceSource, publish};
pub use self::models::{
    gmm_hmm::{GmmHmm, HmmOptions},
    params::HmmParams,
    shape::HmmShape,
    traits::SequenceModel,
};

pub mod prelude {
    pub use super::core::{
        bars::{Observation, PriceBar},
        grid::GridSpec,
        options::{EvaluatorOptions, ForecastOptions},
    };
    pub use super::engine::{ForecastOutcome, Forecaster, train};
    pub use super::errors::{ForecastError, ForecastResult};
    pub use super::io::{CsvPriceSource, CsvReporter, PriceSource, publish};
    pub use super::models::{
        gmm_hmm::{GmmHmm, HmmOptions},
        shape::HmmShape,
        traits::SequenceModel,
    };
}
