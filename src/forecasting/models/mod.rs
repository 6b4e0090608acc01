//! Sequence models the forecast loop can score against.
//!
//! [`traits::SequenceModel`] is the only capability the loop needs. The
//! crate ships one backend, a Gaussian-mixture HMM ([`gmm_hmm::GmmHmm`]),
//! whose parameterization lives in [`params`] and [`shape`].
pub mod gmm_hmm;
pub mod params;
pub mod shape;
pub mod traits;
