//! Supervised training over a formatted line file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dataset::format::{LABEL_PREFIX, parse_line};

use super::model::{
    HuffmanTree, Loss, OutputLayer, SentimentModel, row_dot, sigmoid, softmax,
};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("failed to read training file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid training file {path}: {reason}")]
    InvalidTrainingFile { path: PathBuf, reason: String },
    #[error("invalid training options: {0}")]
    InvalidOptions(String),
}

/// Hyperparameters for supervised training. All fields have defaults and are
/// overridable from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub learning_rate: f32,
    pub epochs: usize,
    /// Word context window: 1 = unigrams only, 2 adds bigrams, and so on.
    pub max_ngram_order: usize,
    pub embedding_dim: usize,
    pub loss: Loss,
    pub min_subword_len: usize,
    pub max_subword_len: usize,
    /// Hashed embedding rows shared by subword and word n-grams.
    pub hash_buckets: usize,
    /// Words seen fewer times than this are dropped from the vocabulary
    /// (their subwords still fire).
    pub min_word_count: u64,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.3,
            epochs: 10,
            max_ngram_order: 2,
            embedding_dim: 100,
            loss: Loss::HierarchicalSoftmax,
            min_subword_len: 2,
            max_subword_len: 5,
            hash_buckets: 100_000,
            min_word_count: 1,
            seed: 42,
        }
    }
}

/// Train a classifier from a formatted line file.
///
/// Reads one `__label__<label> <text>` sample per line, builds the vocabulary
/// and label set, and runs SGD with a linearly decaying learning rate for
/// `epochs` passes. Sample order is shuffled per epoch from a seeded RNG;
/// training is single-threaded, so the result is fully deterministic for a
/// given seed. The returned model is immutable.
pub fn train(train_path: &Path, options: &TrainOptions) -> Result<SentimentModel, TrainError> {
    validate_options(options)?;
    let samples = read_training_file(train_path)?;

    let mut word_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut label_counts: BTreeMap<String, u64> = BTreeMap::new();
    for (label, text) in &samples {
        *label_counts.entry(label.clone()).or_default() += 1;
        for token in text.split_whitespace() {
            *word_counts.entry(token.to_string()).or_default() += 1;
        }
    }
    let labels: Vec<String> = label_counts.keys().cloned().collect();
    let label_index: BTreeMap<String, usize> = labels
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.clone(), idx))
        .collect();

    let mut vocab: BTreeMap<String, u32> = BTreeMap::new();
    for (word, count) in &word_counts {
        if *count >= options.min_word_count {
            vocab.insert(word.clone(), vocab.len() as u32);
        }
    }

    let dim = options.embedding_dim;
    let n_labels = labels.len();
    let mut rng = StdRng::seed_from_u64(options.seed);
    let bound = 1.0 / dim as f32;
    let mut input = vec![0.0f32; (vocab.len() + options.hash_buckets) * dim];
    for value in &mut input {
        *value = (rng.random::<f32>() * 2.0 - 1.0) * bound;
    }
    let output = match options.loss {
        Loss::Softmax => OutputLayer::Softmax {
            weights: vec![0.0; n_labels * dim],
        },
        Loss::OneVsAll => OutputLayer::OneVsAll {
            weights: vec![0.0; n_labels * dim],
        },
        Loss::HierarchicalSoftmax => {
            let counts: Vec<u64> = labels.iter().map(|label| label_counts[label]).collect();
            let tree = HuffmanTree::build(&counts);
            OutputLayer::HierarchicalSoftmax {
                weights: vec![0.0; tree.node_count * dim],
                tree,
            }
        }
    };

    let mut model = SentimentModel {
        model_version: 1,
        labels,
        vocab,
        embedding_dim: dim,
        hash_buckets: options.hash_buckets,
        min_subword_len: options.min_subword_len,
        max_subword_len: options.max_subword_len,
        max_ngram_order: options.max_ngram_order,
        input,
        output,
    };

    // Feature extraction is frozen before SGD so train and inference share
    // the exact same input-row computation.
    let encoded: Vec<(usize, Vec<usize>)> = samples
        .iter()
        .map(|(label, text)| (label_index[label.as_str()], model.input_rows(text)))
        .collect();

    let total = (options.epochs * encoded.len()) as f32;
    let mut seen = 0f32;
    let mut order: Vec<usize> = (0..encoded.len()).collect();
    let mut grad = vec![0.0f32; dim];
    for epoch in 0..options.epochs {
        order.shuffle(&mut rng);
        for &sample_idx in &order {
            let lr = options.learning_rate * (1.0 - seen / total);
            seen += 1.0;
            let (truth, rows) = &encoded[sample_idx];
            if rows.is_empty() {
                continue;
            }
            let hidden = model.embed(rows);
            grad.fill(0.0);
            match &mut model.output {
                OutputLayer::Softmax { weights } => {
                    let scores: Vec<f32> = (0..n_labels)
                        .map(|label| row_dot(weights, label, &hidden))
                        .collect();
                    let probs = softmax(&scores);
                    for label in 0..n_labels {
                        let target = if label == *truth { 1.0 } else { 0.0 };
                        descend(weights, label, &hidden, probs[label] - target, lr, &mut grad);
                    }
                }
                OutputLayer::OneVsAll { weights } => {
                    for label in 0..n_labels {
                        let target = if label == *truth { 1.0 } else { 0.0 };
                        let p = sigmoid(row_dot(weights, label, &hidden));
                        descend(weights, label, &hidden, p - target, lr, &mut grad);
                    }
                }
                OutputLayer::HierarchicalSoftmax { weights, tree } => {
                    let path = &tree.paths[*truth];
                    let codes = &tree.codes[*truth];
                    for (&node, &bit) in path.iter().zip(codes) {
                        let target = if bit { 1.0 } else { 0.0 };
                        let p = sigmoid(row_dot(weights, node as usize, &hidden));
                        descend(weights, node as usize, &hidden, p - target, lr, &mut grad);
                    }
                }
            }
            let scale = lr / rows.len() as f32;
            for &row in rows.iter() {
                let base = row * dim;
                for i in 0..dim {
                    model.input[base + i] -= scale * grad[i];
                }
            }
        }
        debug!(epoch = epoch + 1, "epoch complete");
    }

    model
        .validate()
        .map_err(|reason| TrainError::InvalidOptions(reason))?;
    Ok(model)
}

/// Apply one output-unit gradient step and accumulate the hidden-layer
/// gradient against the pre-update weights.
fn descend(
    weights: &mut [f32],
    row: usize,
    hidden: &[f32],
    diff: f32,
    lr: f32,
    grad: &mut [f32],
) {
    let base = row * hidden.len();
    for (i, &h) in hidden.iter().enumerate() {
        grad[i] += diff * weights[base + i];
        weights[base + i] -= lr * diff * h;
    }
}

fn read_training_file(path: &Path) -> Result<Vec<(String, String)>, TrainError> {
    let file = File::open(path).map_err(|source| TrainError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TrainError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some((label, text)) => samples.push((label.to_string(), text.to_string())),
            None => {
                return Err(TrainError::InvalidTrainingFile {
                    path: path.to_path_buf(),
                    reason: format!("line {} is missing the {LABEL_PREFIX} prefix", idx + 1),
                });
            }
        }
    }
    if samples.is_empty() {
        return Err(TrainError::InvalidTrainingFile {
            path: path.to_path_buf(),
            reason: "file contains no samples".to_string(),
        });
    }
    Ok(samples)
}

fn validate_options(options: &TrainOptions) -> Result<(), TrainError> {
    if options.epochs == 0 {
        return Err(TrainError::InvalidOptions("epochs must be > 0".to_string()));
    }
    if !(options.learning_rate > 0.0 && options.learning_rate.is_finite()) {
        return Err(TrainError::InvalidOptions(
            "learning_rate must be positive and finite".to_string(),
        ));
    }
    if options.embedding_dim == 0 {
        return Err(TrainError::InvalidOptions(
            "embedding_dim must be > 0".to_string(),
        ));
    }
    if options.hash_buckets == 0 {
        return Err(TrainError::InvalidOptions(
            "hash_buckets must be > 0".to_string(),
        ));
    }
    if options.max_subword_len > 0
        && (options.min_subword_len == 0 || options.min_subword_len > options.max_subword_len)
    {
        return Err(TrainError::InvalidOptions(
            "subword length bounds must satisfy 0 < min <= max".to_string(),
        ));
    }
    Ok(())
}
