//! Numerical stability utilities.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form.
//! The functions here follow guarded strategies similar to those
//! in major ML libraries (e.g. PyTorch, TensorFlow), using explicit
//! cutoffs (`x > 20.0`) and max-shifting to keep `f64` arithmetic in a
//! well-conditioned regime.
//!
//! # Provided items
//! - [`safe_softplus(x)`]: stable version of `ln(1 + exp(x))`,
//!   mapping ℝ → (0, ∞) without overflow.
//! - [`safe_softplus_inv(x)`]: inverse of softplus, mapping
//!   (0, ∞) → ℝ without catastrophic cancellation.
//! - [`log_sum_exp(xs)`]: `ln Σ exp(xᵢ)` with max-shift; `-∞` for empty or
//!   all-`-∞` input.
//! - [`log_softmax_into(logits, out)`]: row-wise log-probabilities from
//!   unconstrained logits.

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For sufficiently large `x`, `softplus(x) ≈ x + ln1p(exp(-x)) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
///
/// The cutoff used here (`x > 20.0`) is a practical threshold that
/// keeps the calculation in a well-conditioned regime for `f64`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: solves for `t` in
/// `softplus(t) = x`, returning `t = ln(exp(x) - 1)`.
///
/// - For sufficiently large `x`, `ln(exp(x) - 1) ≈ x`.
/// - Otherwise, it uses `ln(expm1(x))`.
///
/// # Parameters
/// - `x`: a positive real (the softplus output), must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// `ln Σ exp(xᵢ)` computed with a max-shift.
///
/// Returns `f64::NEG_INFINITY` when `xs` is empty or every entry is `-∞`
/// (the log of an empty/zero mass), which is the neutral element the forward
/// recursion expects.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Write `log softmax(logits)` into `out`.
///
/// Uses `out[i] = logits[i] − log_sum_exp(logits)`, so `Σ exp(out[i]) = 1`
/// up to rounding and no intermediate `exp` can overflow.
///
/// # Panics
/// - Panics if `logits.len() != out.len()` (programming error).
pub fn log_softmax_into(logits: &[f64], out: &mut [f64]) {
    assert_eq!(logits.len(), out.len(), "log_softmax_into: length mismatch");
    let lse = log_sum_exp(logits);
    for (o, &l) in out.iter_mut().zip(logits) {
        *o = l - lse;
    }
}
