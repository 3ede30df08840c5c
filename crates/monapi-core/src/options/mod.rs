//! Option normalization.

mod normalizer;

pub use normalizer::{OptionNormalizer, UNIVERSAL_KEYS};
