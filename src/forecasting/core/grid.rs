//! Candidate grid: the discretized space of next observations.
//!
//! Purpose
//! -------
//! Enumerate every candidate `(frac_change, frac_high, frac_low)` the
//! forecast step is allowed to choose from.
//!
//! Key behaviors
//! -------------
//! - Each axis is a half-open range `[start, stop)` cut into `count` equal
//!   steps; value `i` is `start + i·step`, computed directly so no rounding
//!   drift accumulates along the axis.
//! - The grid is the Cartesian product of the three axes. Enumeration order
//!   is stable: `frac_change` varies fastest, then `frac_high`, then
//!   `frac_low`, so grid index `= c + n_c·(h + n_h·l)`.
//! - The default [`GridSpec`] is change `[-0.1, 0.1)` × 50, high `[0, 0.1)` ×
//!   10, low `[0, 0.1)` × 10, i.e. 5000 candidates.
//!
//! Conventions
//! -----------
//! - The grid is regenerated per step and carries no identity across steps.
//! - Grid order is the reference order for tie-breaking: among equal scores
//!   the lowest index wins.
use crate::forecasting::{
    core::bars::Observation,
    errors::{ForecastError, ForecastResult},
};

/// One discretized axis `[start, stop)` with `count` points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    pub start: f64,
    pub stop: f64,
    pub count: usize,
}

impl GridAxis {
    /// Validate and build an axis.
    ///
    /// # Errors
    /// - [`ForecastError::InvalidGridAxis`] if a bound is non-finite,
    ///   `start >= stop`, or `count == 0`. `name` identifies the axis in the
    ///   error.
    pub fn new(name: &'static str, start: f64, stop: f64, count: usize) -> ForecastResult<Self> {
        if !start.is_finite() || !stop.is_finite() {
            return Err(ForecastError::InvalidGridAxis {
                axis: name,
                reason: "bounds must be finite",
            });
        }
        if start >= stop {
            return Err(ForecastError::InvalidGridAxis {
                axis: name,
                reason: "start must be strictly below stop",
            });
        }
        if count == 0 {
            return Err(ForecastError::InvalidGridAxis {
                axis: name,
                reason: "count must be at least 1",
            });
        }
        Ok(GridAxis { start, stop, count })
    }

    #[inline]
    pub fn step(&self) -> f64 {
        (self.stop - self.start) / self.count as f64
    }

    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |i| self.value(i))
    }
}

/// Axes of the candidate grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub change: GridAxis,
    pub high: GridAxis,
    pub low: GridAxis,
}

impl GridSpec {
    pub fn new(change: GridAxis, high: GridAxis, low: GridAxis) -> Self {
        GridSpec { change, high, low }
    }

    /// Number of candidates the three axes produce.
    pub fn size(&self) -> usize {
        self.change.count * self.high.count * self.low.count
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            change: GridAxis { start: -0.1, stop: 0.1, count: 50 },
            high: GridAxis { start: 0.0, stop: 0.1, count: 10 },
            low: GridAxis { start: 0.0, stop: 0.1, count: 10 },
        }
    }
}

/// Materialized candidate grid in stable enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGrid {
    candidates: Vec<Observation>,
}

impl CandidateGrid {
    /// Enumerate all candidates of `spec`.
    pub fn generate(spec: &GridSpec) -> Self {
        let mut candidates = Vec::with_capacity(spec.size());
        for low in spec.low.values() {
            for high in spec.high.values() {
                for change in spec.change.values() {
                    candidates.push(Observation::new(change, high, low));
                }
            }
        }
        CandidateGrid { candidates }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Observation] {
        &self.candidates
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Observation> {
        self.candidates.get(index)
    }
}
