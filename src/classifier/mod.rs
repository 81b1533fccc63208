//! Subword-aware linear text classifier.
//!
//! A compact supervised model in the fastText family: averaged word, subword
//! n-gram, and word n-gram embeddings feeding a linear output layer, trained
//! by SGD. Deterministic for a fixed seed and reproducible from a single
//! binary artifact.

pub mod evaluate;
pub mod model;
pub mod train;

pub use evaluate::{EvalError, EvaluationResult, evaluate};
pub use model::{
    HuffmanTree, Loss, ModelIoError, OutputLayer, Prediction, SentimentModel, softmax,
};
pub use train::{TrainError, TrainOptions, train};
