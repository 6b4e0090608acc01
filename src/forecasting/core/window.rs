//! Fixed-depth rolling window of recent observations.
//!
//! The window always holds exactly `d` observations (`d` = latency depth).
//! [`ObservationWindow::push`] appends the newest and drops the oldest in one
//! move, so no caller ever sees a window of any other length.
use std::collections::VecDeque;

use crate::forecasting::{
    core::bars::Observation,
    errors::{ForecastError, ForecastResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationWindow {
    buf: VecDeque<Observation>,
}

impl ObservationWindow {
    /// Seed the window with the last `depth` entries of `history`.
    ///
    /// # Errors
    /// - [`ForecastError::InvalidLatency`] if `depth == 0`.
    /// - [`ForecastError::InsufficientHistory`] if `history.len() < depth`.
    pub fn from_tail(history: &[Observation], depth: usize) -> ForecastResult<Self> {
        if depth == 0 {
            return Err(ForecastError::InvalidLatency {
                latency: depth,
                reason: "latency must be at least 1",
            });
        }
        if history.len() < depth {
            return Err(ForecastError::InsufficientHistory {
                required: depth,
                available: history.len(),
            });
        }
        let buf = history[history.len() - depth..].iter().copied().collect();
        Ok(ObservationWindow { buf })
    }

    /// Append `obs` and evict the oldest entry; length stays `d`.
    pub fn push(&mut self, obs: Observation) {
        self.buf.pop_front();
        self.buf.push_back(obs);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.buf.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.buf.iter()
    }

    /// Copy the window into `out` followed by `candidate` (length `d + 1`).
    ///
    /// `out` is cleared first so workers can reuse one buffer per chunk.
    pub fn extend_with(&self, candidate: Observation, out: &mut Vec<Observation>) {
        out.clear();
        out.extend(self.buf.iter().copied());
        out.push(candidate);
    }

    pub fn to_vec(&self) -> Vec<Observation> {
        self.buf.iter().copied().collect()
    }
}
