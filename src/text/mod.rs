//! Text normalization and word segmentation.
//!
//! The same normalizer instance configuration must be used when building
//! training data and when classifying new text; a mismatch silently degrades
//! model accuracy without any error signal.

pub mod normalize;
pub mod tokenize;

pub use normalize::TextNormalizer;
pub use tokenize::{LexiconSegmenter, PassthroughSegmenter, Segmenter, select_segmenter};
