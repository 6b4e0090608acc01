//! The scoreable sequence-model capability the forecast loop depends on.
use crate::forecasting::{core::bars::Observation, errors::ForecastResult};

/// A probabilistic model over sequences of [`Observation`]s.
///
/// The forecast loop only needs two things from a model: that it can be
/// trained on a history, and that it can assign a log-likelihood to an
/// arbitrary sequence. `score` takes `&self` and the trait requires `Sync`,
/// so the evaluator's workers may call it concurrently on a shared model.
///
/// # Contract
/// - `fit` consumes a chronological history and leaves the model ready to
///   score; `is_fitted` reports that state.
/// - `score` must not mutate shared state and should return
///   [`ForecastError::ModelNotFitted`] before `fit` has succeeded.
/// - A non-finite score is treated by callers as a failed score.
///
/// [`ForecastError::ModelNotFitted`]: crate::forecasting::errors::ForecastError::ModelNotFitted
pub trait SequenceModel: Sync {
    fn fit(&mut self, data: &[Observation]) -> ForecastResult<()>;

    fn score(&self, sequence: &[Observation]) -> ForecastResult<f64>;

    fn is_fitted(&self) -> bool;
}
