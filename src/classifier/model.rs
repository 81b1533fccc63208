//! Model structure, feature extraction, and prediction.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loss functions supported by the output layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Huffman-coded binary logistics over label frequencies.
    #[default]
    HierarchicalSoftmax,
    /// Full softmax with cross-entropy.
    Softmax,
    /// Independent binary logistic per label.
    OneVsAll,
}

impl std::str::FromStr for Loss {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hs" | "hierarchical_softmax" => Ok(Loss::HierarchicalSoftmax),
            "softmax" => Ok(Loss::Softmax),
            "ova" | "one_vs_all" => Ok(Loss::OneVsAll),
            other => Err(format!(
                "unknown loss '{other}' (expected hs, softmax, or ova)"
            )),
        }
    }
}

/// Top-1 prediction for a single input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum ModelIoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model decode error: {0}")]
    Decode(#[from] bincode::Error),
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Huffman coding over label frequencies for hierarchical softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuffmanTree {
    /// Number of internal nodes (`labels - 1` for two or more labels).
    pub node_count: usize,
    /// Internal nodes on the root-to-leaf path, per label.
    pub paths: Vec<Vec<u32>>,
    /// Branch taken at each path node (`true` = the "one" child), per label.
    pub codes: Vec<Vec<bool>>,
}

impl HuffmanTree {
    /// Build the coding from per-label sample counts.
    ///
    /// Ties are broken by node id so the tree is deterministic for a given
    /// count sequence. Zero counts are treated as one.
    pub fn build(counts: &[u64]) -> Self {
        let k = counts.len();
        if k <= 1 {
            return Self {
                node_count: 0,
                paths: vec![Vec::new(); k],
                codes: vec![Vec::new(); k],
            };
        }
        // Node ids: 0..k are leaves, k..2k-1 are internal; 2k-2 is the root.
        let mut count: Vec<u128> = counts.iter().map(|&c| c.max(1) as u128).collect();
        let mut parent = vec![usize::MAX; 2 * k - 1];
        let mut binary = vec![false; 2 * k - 1];
        let mut active: Vec<usize> = (0..k).collect();
        for next in k..2 * k - 1 {
            active.sort_by(|&a, &b| (count[a], a).cmp(&(count[b], b)));
            let lo = active[0];
            let hi = active[1];
            count.push(count[lo] + count[hi]);
            parent[lo] = next;
            parent[hi] = next;
            binary[hi] = true;
            active.drain(0..2);
            active.push(next);
        }
        let root = 2 * k - 2;
        let mut paths = vec![Vec::new(); k];
        let mut codes = vec![Vec::new(); k];
        for leaf in 0..k {
            let mut node = leaf;
            while node != root {
                let up = parent[node];
                paths[leaf].push((up - k) as u32);
                codes[leaf].push(binary[node]);
                node = up;
            }
            paths[leaf].reverse();
            codes[leaf].reverse();
        }
        Self {
            node_count: k - 1,
            paths,
            codes,
        }
    }
}

/// Output layer weights, one shape per loss function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputLayer {
    /// Rows = labels.
    Softmax { weights: Vec<f32> },
    /// Rows = labels; scores are independent sigmoids.
    OneVsAll { weights: Vec<f32> },
    /// Rows = internal tree nodes.
    HierarchicalSoftmax { weights: Vec<f32>, tree: HuffmanTree },
}

/// Trained sentiment classifier.
///
/// Encapsulates the learned vocabulary, the shared word/subword embedding
/// table, and the output layer. Immutable once training completes; persisted
/// as a single binary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentModel {
    pub model_version: i64,
    /// Ordered label set; prediction indices refer into this list.
    pub labels: Vec<String>,
    /// Word to embedding-row id.
    pub vocab: BTreeMap<String, u32>,
    pub embedding_dim: usize,
    /// Hashed rows shared by subword and word n-grams.
    pub hash_buckets: usize,
    pub min_subword_len: usize,
    pub max_subword_len: usize,
    /// Word context window: 1 = unigrams only, 2 adds bigrams, and so on.
    pub max_ngram_order: usize,
    /// `(vocab + hash_buckets) x embedding_dim`, row-major.
    pub input: Vec<f32>,
    pub output: OutputLayer,
}

impl SentimentModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.labels.is_empty() {
            return Err("model has no labels".to_string());
        }
        if self.embedding_dim == 0 {
            return Err("embedding_dim must be > 0".to_string());
        }
        if self.hash_buckets == 0 {
            return Err("hash_buckets must be > 0".to_string());
        }
        if self.max_subword_len > 0
            && (self.min_subword_len == 0 || self.min_subword_len > self.max_subword_len)
        {
            return Err("subword length bounds must satisfy 0 < min <= max".to_string());
        }
        let expected = (self.vocab.len() + self.hash_buckets) * self.embedding_dim;
        if self.input.len() != expected {
            return Err("input matrix length mismatch".to_string());
        }
        for &id in self.vocab.values() {
            if id as usize >= self.vocab.len() {
                return Err("vocab id out of range".to_string());
            }
        }
        match &self.output {
            OutputLayer::Softmax { weights } | OutputLayer::OneVsAll { weights } => {
                if weights.len() != self.labels.len() * self.embedding_dim {
                    return Err("output weights length mismatch".to_string());
                }
            }
            OutputLayer::HierarchicalSoftmax { weights, tree } => {
                if tree.paths.len() != self.labels.len() || tree.codes.len() != self.labels.len() {
                    return Err("huffman tree does not cover the label set".to_string());
                }
                if weights.len() != tree.node_count * self.embedding_dim {
                    return Err("output weights length mismatch".to_string());
                }
            }
        }
        Ok(())
    }

    /// Embedding rows activated by normalized text: vocabulary words, hashed
    /// subword n-grams, and hashed word n-grams.
    ///
    /// Out-of-vocabulary words still contribute their subwords, which is what
    /// lets the model generalize to rare and misspelled forms.
    pub fn input_rows(&self, normalized_text: &str) -> Vec<usize> {
        let tokens: Vec<&str> = normalized_text.split_whitespace().collect();
        let mut rows = Vec::new();
        let mut token_hashes = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if let Some(&id) = self.vocab.get(*token) {
                rows.push(id as usize);
            }
            self.push_subword_rows(token, &mut rows);
            token_hashes.push(fnv1a(token.as_bytes()));
        }
        self.push_word_ngram_rows(&token_hashes, &mut rows);
        rows
    }

    /// Mean of the activated embedding rows (zeros when no rows fire).
    pub fn embed(&self, rows: &[usize]) -> Vec<f32> {
        let mut hidden = vec![0.0f32; self.embedding_dim];
        if rows.is_empty() {
            return hidden;
        }
        for &row in rows {
            let base = row * self.embedding_dim;
            for i in 0..self.embedding_dim {
                hidden[i] += self.input[base + i];
            }
        }
        let inv = 1.0 / rows.len() as f32;
        for value in &mut hidden {
            *value *= inv;
        }
        hidden
    }

    /// Per-label confidence scores for a hidden vector, each in `[0, 1]`.
    pub fn predict_probabilities(&self, hidden: &[f32]) -> Vec<f32> {
        match &self.output {
            OutputLayer::Softmax { weights } => {
                let scores: Vec<f32> = (0..self.labels.len())
                    .map(|label| row_dot(weights, label, hidden))
                    .collect();
                softmax(&scores)
            }
            OutputLayer::OneVsAll { weights } => (0..self.labels.len())
                .map(|label| sigmoid(row_dot(weights, label, hidden)))
                .collect(),
            OutputLayer::HierarchicalSoftmax { weights, tree } => {
                let mut probs = Vec::with_capacity(self.labels.len());
                for label in 0..self.labels.len() {
                    let mut prob = 1.0f32;
                    for (&node, &bit) in tree.paths[label].iter().zip(&tree.codes[label]) {
                        let p = sigmoid(row_dot(weights, node as usize, hidden));
                        prob *= if bit { p } else { 1.0 - p };
                    }
                    probs.push(prob);
                }
                probs
            }
        }
    }

    /// Top-1 prediction for normalized text.
    pub fn predict(&self, normalized_text: &str) -> Prediction {
        let rows = self.input_rows(normalized_text);
        let hidden = self.embed(&rows);
        let probs = self.predict_probabilities(&hidden);
        let mut best = 0usize;
        let mut best_val = f32::NEG_INFINITY;
        for (idx, &p) in probs.iter().enumerate() {
            if p > best_val {
                best_val = p;
                best = idx;
            }
        }
        Prediction {
            label: self.labels.get(best).cloned().unwrap_or_default(),
            confidence: best_val.clamp(0.0, 1.0),
        }
    }

    /// Persist the model as a single binary file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelIoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load and validate a model saved with [`SentimentModel::save`].
    pub fn load(path: &Path) -> Result<Self, ModelIoError> {
        let bytes = std::fs::read(path)?;
        let model: Self = bincode::deserialize(&bytes)?;
        model.validate().map_err(ModelIoError::Invalid)?;
        Ok(model)
    }

    fn push_subword_rows(&self, word: &str, rows: &mut Vec<usize>) {
        if self.max_subword_len == 0 {
            return;
        }
        let wrapped = format!("<{word}>");
        let mut bounds: Vec<usize> = wrapped.char_indices().map(|(offset, _)| offset).collect();
        bounds.push(wrapped.len());
        let n_chars = bounds.len() - 1;
        let bytes = wrapped.as_bytes();
        for start in 0..n_chars {
            let longest = self.max_subword_len.min(n_chars - start);
            for len in self.min_subword_len..=longest {
                let ngram = &bytes[bounds[start]..bounds[start + len]];
                rows.push(self.vocab.len() + (fnv1a(ngram) as usize % self.hash_buckets));
            }
        }
    }

    fn push_word_ngram_rows(&self, token_hashes: &[u32], rows: &mut Vec<usize>) {
        for order in 2..=self.max_ngram_order {
            for window in token_hashes.windows(order) {
                let mut hash = window[0] as u64;
                for &token in &window[1..] {
                    hash = hash.wrapping_mul(116_049_371).wrapping_add(token as u64);
                }
                rows.push(self.vocab.len() + (hash % self.hash_buckets as u64) as usize);
            }
        }
    }
}

/// Compute a numerically-stable softmax for a set of scores.
pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut exps = Vec::with_capacity(raw.len());
    let mut sum = 0.0f32;
    for &value in raw {
        let e = (value - max).exp();
        exps.push(e);
        sum += e;
    }
    if sum == 0.0 {
        return vec![1.0 / raw.len() as f32; raw.len()];
    }
    for value in &mut exps {
        *value /= sum;
    }
    exps
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn row_dot(weights: &[f32], row: usize, hidden: &[f32]) -> f32 {
    let base = row * hidden.len();
    let mut sum = 0.0f32;
    for (i, &h) in hidden.iter().enumerate() {
        sum += weights[base + i] * h;
    }
    sum
}

/// fastText's FNV-1a variant used for n-gram bucketing.
pub(crate) fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
