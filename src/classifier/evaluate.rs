//! Held-out evaluation producing precision@1 / recall@1.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::dataset::format::{LABEL_PREFIX, parse_line};

use super::model::SentimentModel;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to read validation file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid validation file {path}: {reason}")]
    InvalidValidationFile { path: PathBuf, reason: String },
}

/// Aggregate top-1 metrics over a validation file.
///
/// Every sample yields exactly one top-1 prediction, so precision@1 and
/// recall@1 are equal by construction in this single-label setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub sample_count: usize,
    pub precision_at_1: f32,
    pub recall_at_1: f32,
}

/// Predict every validation line against its stripped label and aggregate.
pub fn evaluate(
    model: &SentimentModel,
    valid_path: &Path,
) -> Result<EvaluationResult, EvalError> {
    let file = File::open(valid_path).map_err(|source| EvalError::Read {
        path: valid_path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut attempted = 0usize;
    let mut correct = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| EvalError::Read {
            path: valid_path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let Some((truth, text)) = parse_line(&line) else {
            return Err(EvalError::InvalidValidationFile {
                path: valid_path.to_path_buf(),
                reason: format!("line {} is missing the {LABEL_PREFIX} prefix", idx + 1),
            });
        };
        let prediction = model.predict(text);
        attempted += 1;
        if prediction.label == truth {
            correct += 1;
        }
    }
    let ratio = if attempted == 0 {
        0.0
    } else {
        correct as f32 / attempted as f32
    };
    Ok(EvaluationResult {
        sample_count: attempted,
        precision_at_1: ratio,
        recall_at_1: ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::train::{TrainOptions, train};
    use crate::classifier::model::Loss;
    use tempfile::tempdir;

    fn trained_model(dir: &tempfile::TempDir) -> SentimentModel {
        let train_path = dir.path().join("train.txt");
        let mut lines = Vec::new();
        for _ in 0..10 {
            lines.push("__label__pos rất tốt tuyệt vời");
            lines.push("__label__neg quá tệ rất dở");
        }
        std::fs::write(&train_path, lines.join("\n")).unwrap();
        let options = TrainOptions {
            learning_rate: 0.5,
            epochs: 25,
            embedding_dim: 16,
            loss: Loss::Softmax,
            hash_buckets: 2_000,
            max_subword_len: 4,
            ..TrainOptions::default()
        };
        train(&train_path, &options).unwrap()
    }

    #[test]
    fn precision_equals_recall() {
        let dir = tempdir().unwrap();
        let model = trained_model(&dir);
        let valid_path = dir.path().join("valid.txt");
        std::fs::write(
            &valid_path,
            "__label__pos rất tốt\n__label__neg quá tệ\n__label__pos quá tệ\n",
        )
        .unwrap();
        let result = evaluate(&model, &valid_path).unwrap();
        assert_eq!(result.sample_count, 3);
        assert_eq!(result.precision_at_1, result.recall_at_1);
        assert!((0.0..=1.0).contains(&result.precision_at_1));
    }

    #[test]
    fn perfect_validation_set_scores_one() {
        let dir = tempdir().unwrap();
        let model = trained_model(&dir);
        let valid_path = dir.path().join("valid.txt");
        std::fs::write(&valid_path, "__label__pos rất tốt\n__label__neg quá tệ\n").unwrap();
        let result = evaluate(&model, &valid_path).unwrap();
        assert_eq!(result.sample_count, 2);
        assert!((result.precision_at_1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_line_is_rejected() {
        let dir = tempdir().unwrap();
        let model = trained_model(&dir);
        let valid_path = dir.path().join("valid.txt");
        std::fs::write(&valid_path, "không có nhãn\n").unwrap();
        let err = evaluate(&model, &valid_path).unwrap_err();
        assert!(matches!(err, EvalError::InvalidValidationFile { .. }));
    }

    #[test]
    fn empty_validation_file_counts_zero() {
        let dir = tempdir().unwrap();
        let model = trained_model(&dir);
        let valid_path = dir.path().join("valid.txt");
        std::fs::write(&valid_path, "").unwrap();
        let result = evaluate(&model, &valid_path).unwrap();
        assert_eq!(result.sample_count, 0);
        assert_eq!(result.precision_at_1, 0.0);
    }
}
