//! Integration tests for the forecast pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow: price bars from a source, encoding,
//!   model training, the multi-step forecast loop, accuracy, and reporting.
//! - Pin down the observable contract of the loop (selection, price
//!   conversion, feedback of predictions) with a model whose preferences are
//!   known, then run the real GMM-HMM through the same path.
//!
//! Coverage
//! --------
//! - `forecasting::io`: `CsvPriceSource`, `CsvReporter`, `publish`.
//! - `forecasting::engine`: `train`, `Forecaster::run`.
//! - `forecasting::models::gmm_hmm::GmmHmm` fitted through
//!   `optimization::loglik_optimizer`.
//! - `forecasting::core::metrics::mean_abs_percent_error`.
//!
//! Exclusions
//! ----------
//! - Grid arithmetic, window mechanics, evaluator chunking and error
//!   variants; those are covered by unit tests.
//! - Python bindings.
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use frac_forecast::{
    forecasting::{
        CsvPriceSource, CsvReporter, EvaluatorOptions, ForecastError, ForecastOptions,
        ForecastResult, Forecaster, GmmHmm, GridAxis, GridSpec, HmmOptions, HmmShape,
        Observation, PriceBar, PriceSource, SequenceModel, encode_bars, mean_abs_percent_error,
        publish, train,
    },
    optimization::loglik_optimizer::{LineSearcher, MLEOptions, Tolerances},
};
use ndarray::array;

/// Scores only the last observation of a sequence by its squared distance
/// to `target`; the maximum is at `target`.
struct Peaked {
    target: Observation,
    fitted: bool,
}

impl Peaked {
    fn new(frac_change: f64, frac_high: f64, frac_low: f64) -> Self {
        Peaked { target: Observation::new(frac_change, frac_high, frac_low), fitted: false }
    }
}

impl SequenceModel for Peaked {
    fn fit(&mut self, data: &[Observation]) -> ForecastResult<()> {
        if data.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        self.fitted = true;
        Ok(())
    }

    fn score(&self, sequence: &[Observation]) -> ForecastResult<f64> {
        let last = sequence.last().ok_or(ForecastError::EmptySeries)?;
        Ok(-((last.frac_change - self.target.frac_change).powi(2)
            + (last.frac_high - self.target.frac_high).powi(2)
            + (last.frac_low - self.target.frac_low).powi(2)))
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Deterministic bars with a slow drift and a weekly wiggle.
///
/// Every bar has `low <= min(open, close)` and `high >= max(open, close)`.
fn synthetic_bars(n: usize, base: f64) -> Vec<PriceBar> {
    (0..n)
        .map(|t| {
            let tf = t as f64;
            let open = base * (1.0 + 0.002 * tf) + (tf * 0.9).sin();
            let close = open * (1.0 + 0.01 * (tf * 1.3).cos());
            let high = open.max(close) * (1.0 + 0.004 + 0.002 * (tf * 0.7).sin().abs());
            let low = open.min(close) * (1.0 - 0.003 - 0.002 * (tf * 0.5).cos().abs());
            PriceBar::new(open, high, low, close)
        })
        .collect()
}

fn date_for(i: usize) -> String {
    format!("2020-{:02}-{:02}", 1 + i / 28, 1 + i % 28)
}

fn write_ticker_csv(dir: &Path, ticker: &str, bars: &[PriceBar]) {
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    // Newest first, the way many vendors export.
    for (i, bar) in bars.iter().enumerate().rev() {
        body.push_str(&format!(
            "{},{},{},{},{},1000\n",
            date_for(i),
            bar.open,
            bar.high,
            bar.low,
            bar.close
        ));
    }
    fs::write(dir.join(format!("{ticker}.csv")), body).expect("write fixture");
}

fn options(latency: usize, chunk_count: usize, workers: usize) -> ForecastOptions {
    let evaluator = EvaluatorOptions::new(chunk_count, Some(workers), None).expect("valid");
    ForecastOptions::new(latency, GridSpec::default(), evaluator).expect("valid")
}

fn coarse_grid() -> GridSpec {
    GridSpec::new(
        GridAxis::new("frac_change", -0.05, 0.05, 10).expect("valid"),
        GridAxis::new("frac_high", 0.0, 0.05, 5).expect("valid"),
        GridAxis::new("frac_low", 0.0, 0.05, 5).expect("valid"),
    )
}

fn small_hmm() -> GmmHmm {
    let tols = Tolerances::new(Some(1e-6), None, Some(5)).expect("valid tolerances");
    let mle = MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid options");
    let options = HmmOptions::new(mle, 1e-3).expect("valid min_std");
    GmmHmm::new(HmmShape::new(2, 1).expect("valid shape"), options)
}

#[test]
// Purpose
// -------
// Full loop on the default 5000-point grid with a model peaked on a grid
// point: first prediction and compounding of later ones.
//
// Given
// -----
// - Latency 2; training bars whose last two encode to (0.01, 0.02, 0.01)
//   and (0.02, 0.01, 0.02).
// - Model peaked at (0.048, 0.03, 0.0); test opens 100, 50, 500.
//
// Expect
// ------
// - predicted[0] = 0.048·100 + 100 = 104.8, then ×1.048 per step.
// - Later test opens never influence predictions.
// - Final window ends with the winning candidate.
fn peaked_model_compounds_from_first_test_open() {
    let train_bars = vec![
        PriceBar::new(100.0, 102.0, 99.0, 101.0),
        PriceBar::new(100.0, 102.0, 99.0, 101.0),
        PriceBar::new(100.0, 101.0, 98.0, 102.0),
    ];
    let test_bars = vec![
        PriceBar::new(100.0, 106.0, 99.0, 105.0),
        PriceBar::new(50.0, 111.0, 49.0, 110.0),
        PriceBar::new(500.0, 501.0, 100.0, 115.0),
    ];
    let mut model = Peaked::new(0.048, 0.03, 0.0);

    let train_obs = train(&mut model, &train_bars).expect("training succeeds");
    let forecaster = Forecaster::new(&model, options(2, 20, 2)).expect("pool builds");
    let outcome = forecaster.run(&train_obs, &test_bars).expect("run succeeds");

    assert_eq!(outcome.predicted.len(), 3);
    assert_relative_eq!(outcome.predicted[0], 104.8, epsilon = 1e-9);
    assert_relative_eq!(outcome.predicted[1], 104.8 * 1.048, epsilon = 1e-9);
    assert_relative_eq!(outcome.predicted[2], 104.8 * 1.048 * 1.048, epsilon = 1e-9);
    assert_eq!(outcome.actual, array![105.0, 110.0, 115.0]);
    assert_eq!(outcome.final_window.len(), 2);
    assert_relative_eq!(outcome.final_window[1].frac_change, 0.048, epsilon = 1e-12);
    assert!(outcome.steps.iter().all(|s| s.scored == 5000 && s.failed == 0));
}

#[test]
// Purpose
// -------
// The accuracy metric matches a hand computation.
fn mape_reference_value() {
    let mape = mean_abs_percent_error(array![105.0, 110.0].view(), array![100.0, 100.0].view())
        .expect("valid");
    assert_relative_eq!(mape, 7.5, epsilon = 1e-12);
}

#[test]
// Purpose
// -------
// Forecasts do not depend on the worker count or on how candidates are
// chunked, and repeated runs agree exactly.
//
// Given
// -----
// - A small GMM-HMM fitted once on synthetic bars.
// - Coarse 250-point grid, latency 5, three different evaluator settings.
//
// Expect
// ------
// - Identical predicted series across all runs.
fn gmm_hmm_forecast_is_deterministic_across_parallel_settings() {
    let bars = synthetic_bars(45, 50.0);
    let (train_bars, test_bars) = bars.split_at(40);
    let mut model = small_hmm();
    let train_obs = train(&mut model, train_bars).expect("training succeeds");
    assert!(model.is_fitted());

    let run = |chunk_count: usize, workers: usize| {
        let evaluator = EvaluatorOptions::new(chunk_count, Some(workers), None).expect("valid");
        let opts = ForecastOptions::new(5, coarse_grid(), evaluator).expect("valid");
        let forecaster = Forecaster::new(&model, opts).expect("pool builds");
        forecaster.run(&train_obs, test_bars).expect("run succeeds")
    };

    let a = run(20, 4);
    let b = run(20, 4);
    let c = run(1, 1);
    let d = run(7, 3);

    assert_eq!(a.predicted, b.predicted);
    assert_eq!(a.predicted, c.predicted);
    assert_eq!(a.predicted, d.predicted);
    assert_eq!(a.steps.len(), 5);
    assert!(a.predicted.iter().all(|p| p.is_finite() && *p > 0.0));
    assert!(a.mape().expect("mape").is_finite());
}

#[test]
// Purpose
// -------
// Each prediction is exactly the previous reference moved by the winning
// candidate's fractional change; the reference chain starts at the first
// test open.
fn gmm_hmm_predictions_chain_from_reference_price() {
    let bars = synthetic_bars(44, 80.0);
    let (train_bars, test_bars) = bars.split_at(40);
    let mut model = small_hmm();
    let train_obs = train(&mut model, train_bars).expect("training succeeds");

    let evaluator = EvaluatorOptions::new(8, Some(2), None).expect("valid");
    let opts = ForecastOptions::new(4, coarse_grid(), evaluator).expect("valid");
    let outcome = Forecaster::new(&model, opts)
        .expect("pool builds")
        .run(&train_obs, test_bars)
        .expect("run succeeds");

    let mut reference = test_bars[0].open;
    for (i, step) in outcome.steps.iter().enumerate() {
        assert_eq!(step.step, i);
        assert_relative_eq!(step.reference_price, reference, epsilon = 1e-12);
        let expected = step.winner.observation.frac_change * reference + reference;
        assert_relative_eq!(outcome.predicted[i], expected, epsilon = 1e-9);
        reference = outcome.predicted[i];
    }
}

#[test]
// Purpose
// -------
// CSV files in, CSV report out, with a failing reporter contained.
//
// Given
// -----
// - A ticker file with 33 daily rows (newest first) and an extra column.
// - Training range covering January, test range the first five days of
//   February.
//
// Expect
// ------
// - 28 training bars and 5 test bars, oldest first.
// - A report with one row per test bar.
// - Publishing into a missing directory returns false and leaves the
//   outcome usable.
fn csv_source_to_report_round() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let out_dir = tempfile::tempdir().expect("tempdir");
    let bars = synthetic_bars(33, 120.0);
    write_ticker_csv(data_dir.path(), "ACME", &bars);

    let source = CsvPriceSource::new(data_dir.path());
    let train_bars = source.fetch("ACME", "2020-01-01", "2020-01-28").expect("train fetch");
    let test_bars = source.fetch("ACME", "2020-02-01", "2020-02-05").expect("test fetch");
    assert_eq!(train_bars.len(), 28);
    assert_eq!(test_bars.len(), 5);
    assert_eq!(train_bars[0].date.as_deref(), Some("2020-01-01"));
    assert_relative_eq!(test_bars[0].open, bars[28].open, epsilon = 1e-9);

    let mut model = Peaked::new(0.0, 0.01, 0.01);
    let train_obs = train(&mut model, &train_bars).expect("training succeeds");
    assert_eq!(train_obs.len(), encode_bars(&train_bars).expect("encodes").len());
    let outcome = Forecaster::new(&model, options(10, 20, 2))
        .expect("pool builds")
        .run(&train_obs, &test_bars)
        .expect("run succeeds");

    let reporter = CsvReporter::new(out_dir.path());
    assert!(publish(&reporter, &outcome, "ACME forecast"));
    let text = fs::read_to_string(out_dir.path().join("ACME_forecast.csv")).expect("report");
    assert_eq!(text.lines().count(), 1 + test_bars.len());

    let missing = CsvReporter::new(out_dir.path().join("does-not-exist"));
    assert!(!publish(&missing, &outcome, "ACME forecast"));
    assert!(outcome.mape().expect("mape").is_finite());
}

#[test]
// Purpose
// -------
// Input problems surface as structured errors before any forecasting.
fn pipeline_rejects_bad_inputs() {
    let model = Peaked::new(0.0, 0.0, 0.0);
    let forecaster = Forecaster::new(&model, options(2, 20, 1)).expect("pool builds");
    let history = vec![Observation::new(0.0, 0.0, 0.0); 3];
    let test_bars = vec![PriceBar::new(100.0, 101.0, 99.0, 100.0)];

    assert_eq!(forecaster.run(&history, &test_bars).unwrap_err(), ForecastError::ModelNotFitted);

    let mut fitted = Peaked::new(0.0, 0.0, 0.0);
    fitted.fit(&history).expect("fit");
    let forecaster = Forecaster::new(&fitted, options(5, 20, 1)).expect("pool builds");
    assert!(matches!(
        forecaster.run(&history, &test_bars).unwrap_err(),
        ForecastError::InsufficientHistory { required: 5, available: 3 }
    ));

    let bad = vec![PriceBar::new(0.0, 1.0, 0.0, 1.0)];
    assert!(matches!(
        encode_bars(&bad).unwrap_err(),
        ForecastError::NonPositiveOpen { index: 0, .. }
    ));
}
