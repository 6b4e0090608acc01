//! Core building blocks of the forecast search.
//!
//! - [`bars`]: price bars and the fractional observation encoding.
//! - [`grid`]: the discretized candidate space.
//! - [`window`]: the fixed-depth rolling observation window.
//! - [`evaluator`]: parallel scoring of candidates against a model.
//! - [`options`]: validated run configuration.
//! - [`metrics`]: forecast accuracy.
pub mod bars;
pub mod evaluator;
pub mod grid;
pub mod metrics;
pub mod options;
pub mod window;
