//! Parallel likelihood evaluator. Scores every grid candidate per step.
//!
//! Purpose
//! -------
//! Given the current observation window and the candidate grid, score each
//! candidate as the continuation `window ++ [candidate]` under a
//! [`SequenceModel`], spreading the work over a worker pool.
//!
//! Key behaviors
//! -------------
//! - The grid is split into `chunk_count` contiguous chunks of
//!   `ceil(n / chunk_count)` candidates; every candidate lands in exactly one
//!   chunk.
//! - Chunks run on a rayon [`ThreadPool`] owned by the evaluator and reused
//!   across steps. Pool size is independent of the chunk count.
//! - The call blocks until every chunk has finished (full join). Results are
//!   re-assembled in grid order, so selection never depends on completion
//!   order.
//! - Failures are isolated: a candidate whose score errors or is non-finite
//!   is dropped alone, and a panicking chunk drops only its own candidates.
//!   If nothing survives the step fails with
//!   [`ForecastError::NoValidCandidates`].
//! - With a deadline configured, workers check it before each candidate and
//!   the step fails with [`ForecastError::StepDeadlineExceeded`] once it has
//!   passed. A `score` call already running is not interrupted: the step
//!   returns only after in-flight candidates finish, so a model whose `score`
//!   never returns blocks the step regardless of the deadline.
//!
//! Conventions
//! -----------
//! - Workers share the window, the grid, and the model by `&` borrow and
//!   return results by value. There are no locks.
use std::{
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tracing::{debug, warn};

use crate::forecasting::{
    core::{
        bars::Observation, grid::CandidateGrid, options::EvaluatorOptions,
        window::ObservationWindow,
    },
    errors::{ForecastError, ForecastResult},
    models::traits::SequenceModel,
};

/// A candidate together with its grid index and log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub index: usize,
    pub observation: Observation,
    pub log_lik: f64,
}

/// Result of scoring one grid.
///
/// `scored` is in grid order. `failed` counts every candidate that produced
/// no score, including those lost to a panicking chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub scored: Vec<ScoredCandidate>,
    pub failed: usize,
    pub failed_chunks: usize,
}

impl Evaluation {
    /// Candidate with the strictly greatest score.
    ///
    /// Scanning in grid order with `>` means later equal scores never
    /// replace the incumbent, so ties go to the lowest grid index.
    pub fn best(&self) -> Option<&ScoredCandidate> {
        let mut best: Option<&ScoredCandidate> = None;
        for candidate in &self.scored {
            if best.map_or(true, |b| candidate.log_lik > b.log_lik) {
                best = Some(candidate);
            }
        }
        best
    }
}

enum ChunkOutcome {
    Scored { scored: Vec<ScoredCandidate>, failed: usize },
    TimedOut,
    Panicked { chunk: usize, len: usize },
}

/// Fan-out/fan-in scorer with a long-lived worker pool.
#[derive(Debug)]
pub struct LikelihoodEvaluator {
    options: EvaluatorOptions,
    pool: ThreadPool,
}

impl LikelihoodEvaluator {
    /// Build the evaluator and its worker pool.
    ///
    /// # Errors
    /// - [`ForecastError::ThreadPool`] if rayon cannot spawn the workers.
    pub fn new(options: EvaluatorOptions) -> ForecastResult<Self> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("frac-forecast-worker-{i}"));
        if let Some(n) = options.workers {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        Ok(LikelihoodEvaluator { options, pool })
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Score every candidate of `grid` appended to `window`.
    ///
    /// `step` is only used to label errors and log lines.
    ///
    /// # Errors
    /// - [`ForecastError::StepDeadlineExceeded`] if the configured deadline
    ///   passes before the join completes.
    /// - [`ForecastError::NoValidCandidates`] if no candidate was scored.
    pub fn evaluate<M>(
        &self, model: &M, window: &ObservationWindow, grid: &CandidateGrid, step: usize,
    ) -> ForecastResult<Evaluation>
    where
        M: SequenceModel + ?Sized,
    {
        if grid.is_empty() {
            return Err(ForecastError::NoValidCandidates { step });
        }
        let started = Instant::now();
        let expires_at = self.options.deadline.map(|d| started + d);
        let size = chunk_size(grid.len(), self.options.chunk_count);

        let outcomes: Vec<ChunkOutcome> = self.pool.install(|| {
            grid.as_slice()
                .par_chunks(size)
                .enumerate()
                .map(|(chunk, candidates)| {
                    let offset = chunk * size;
                    let run = || score_chunk(model, window, candidates, offset, expires_at, step);
                    panic::catch_unwind(AssertUnwindSafe(run))
                        .unwrap_or(ChunkOutcome::Panicked { chunk, len: candidates.len() })
                })
                .collect()
        });

        let mut evaluation =
            Evaluation { scored: Vec::with_capacity(grid.len()), failed: 0, failed_chunks: 0 };
        let mut timed_out = false;
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Scored { scored, failed } => {
                    evaluation.scored.extend(scored);
                    evaluation.failed += failed;
                }
                ChunkOutcome::TimedOut => timed_out = true,
                ChunkOutcome::Panicked { chunk, len } => {
                    warn!(step, chunk, candidates = len, "scoring chunk panicked; dropping it");
                    evaluation.failed += len;
                    evaluation.failed_chunks += 1;
                }
            }
        }

        if let Some(deadline) = self.options.deadline {
            if timed_out || started.elapsed() > deadline {
                return Err(ForecastError::StepDeadlineExceeded { step, deadline });
            }
        }
        if evaluation.scored.is_empty() {
            return Err(ForecastError::NoValidCandidates { step });
        }
        Ok(evaluation)
    }
}

/// `ceil(n / chunk_count)`, at least 1.
pub fn chunk_size(n: usize, chunk_count: usize) -> usize {
    n.div_ceil(chunk_count.max(1)).max(1)
}

fn score_chunk<M>(
    model: &M, window: &ObservationWindow, candidates: &[Observation], offset: usize,
    expires_at: Option<Instant>, step: usize,
) -> ChunkOutcome
where
    M: SequenceModel + ?Sized,
{
    let mut sequence = Vec::with_capacity(window.depth() + 1);
    let mut scored = Vec::with_capacity(candidates.len());
    let mut failed = 0;
    for (i, &candidate) in candidates.iter().enumerate() {
        if expires_at.is_some_and(|at| Instant::now() >= at) {
            return ChunkOutcome::TimedOut;
        }
        let index = offset + i;
        window.extend_with(candidate, &mut sequence);
        match model.score(&sequence) {
            Ok(log_lik) if log_lik.is_finite() => {
                scored.push(ScoredCandidate { index, observation: candidate, log_lik });
            }
            Ok(log_lik) => {
                debug!(step, index, log_lik, "non-finite candidate score");
                failed += 1;
            }
            Err(err) => {
                debug!(step, index, error = %err, "candidate score failed");
                failed += 1;
            }
        }
    }
    ChunkOutcome::Scored { scored, failed }
}
