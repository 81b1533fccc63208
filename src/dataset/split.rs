//! Stratified train/validation partitioning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// File name for the training partition inside the output directory.
pub const TRAIN_FILE_NAME: &str = "train.txt";
/// File name for the validation partition inside the output directory.
pub const VALID_FILE_NAME: &str = "valid.txt";

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("validation fraction {0} must be in (0, 1)")]
    InvalidFraction(f64),
    #[error("no samples to split")]
    EmptyInput,
    #[error("lines and labels must have equal lengths ({lines} vs {labels})")]
    LengthMismatch { lines: usize, labels: usize },
    #[error(
        "class '{label}' has {count} samples; cannot place it in both partitions at validation fraction {fraction}"
    )]
    InsufficientData {
        label: String,
        count: usize,
        fraction: f64,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Ordered, disjoint train/validation partitions of the formatted dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub train: Vec<String>,
    pub validation: Vec<String>,
}

/// Partitions plus the files they were persisted to.
#[derive(Debug)]
pub struct SplitFiles {
    pub train_path: PathBuf,
    pub valid_path: PathBuf,
    pub result: SplitResult,
}

/// Stratified partition of formatted lines keyed by their labels.
///
/// Each class keeps its input-set proportion (within rounding) in both
/// partitions. Assignment is ordered by a content hash of
/// `(seed, label, index)`, so the same input and seed always produce the same
/// partitions; both outputs preserve the original input ordering.
///
/// Classes with a single member are routed to train with a warning. A class
/// with two or more members whose rounded validation share would leave one
/// partition empty fails with [`SplitError::InsufficientData`].
pub fn split_lines(
    lines: &[String],
    labels: &[String],
    validation_fraction: f64,
    seed: u64,
) -> Result<SplitResult, SplitError> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(validation_fraction));
    }
    if lines.len() != labels.len() {
        return Err(SplitError::LengthMismatch {
            lines: lines.len(),
            labels: labels.len(),
        });
    }
    if lines.is_empty() {
        return Err(SplitError::EmptyInput);
    }

    let mut by_class: BTreeMap<&str, Vec<(u128, usize)>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        let hash = blake3::hash(format!("{seed}|{label}|{idx}").as_bytes());
        let key = u128::from_le_bytes(hash.as_bytes()[0..16].try_into().expect("slice size"));
        by_class.entry(label.as_str()).or_default().push((key, idx));
    }

    let mut to_validation = vec![false; lines.len()];
    for (label, mut entries) in by_class {
        let n = entries.len();
        if n == 1 {
            warn!(label, "single-sample class routed to train");
            continue;
        }
        let valid_n = ((n as f64) * validation_fraction).round() as usize;
        if valid_n == 0 || valid_n >= n {
            return Err(SplitError::InsufficientData {
                label: label.to_string(),
                count: n,
                fraction: validation_fraction,
            });
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (_key, idx) in entries.into_iter().take(valid_n) {
            to_validation[idx] = true;
        }
    }

    let mut train = Vec::new();
    let mut validation = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if to_validation[idx] {
            validation.push(line.clone());
        } else {
            train.push(line.clone());
        }
    }
    Ok(SplitResult { train, validation })
}

/// Partition the dataset and persist both splits under `output_dir`,
/// overwriting any prior `train.txt` / `valid.txt`.
pub fn split_to_files(
    lines: &[String],
    labels: &[String],
    validation_fraction: f64,
    seed: u64,
    output_dir: &Path,
) -> Result<SplitFiles, SplitError> {
    let result = split_lines(lines, labels, validation_fraction, seed)?;
    std::fs::create_dir_all(output_dir).map_err(|source| SplitError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let train_path = output_dir.join(TRAIN_FILE_NAME);
    let valid_path = output_dir.join(VALID_FILE_NAME);
    write_lines(&train_path, &result.train)?;
    write_lines(&valid_path, &result.validation)?;
    Ok(SplitFiles {
        train_path,
        valid_path,
        result,
    })
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), SplitError> {
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text).map_err(|source| SplitError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn labeled(counts: &[(&str, usize)]) -> (Vec<String>, Vec<String>) {
        let mut lines = Vec::new();
        let mut labels = Vec::new();
        for (label, count) in counts {
            for idx in 0..*count {
                lines.push(format!("__label__{label} sample {idx}"));
                labels.push(label.to_string());
            }
        }
        (lines, labels)
    }

    #[test]
    fn partitions_cover_the_input() {
        let (lines, labels) = labeled(&[("pos", 10), ("neg", 10)]);
        let split = split_lines(&lines, &labels, 0.2, 42).unwrap();
        assert_eq!(split.train.len() + split.validation.len(), lines.len());
        for line in lines {
            let in_train = split.train.contains(&line);
            let in_valid = split.validation.contains(&line);
            assert!(in_train != in_valid, "line must land in exactly one partition");
        }
    }

    #[test]
    fn label_fractions_are_preserved() {
        let (lines, labels) = labeled(&[("pos", 60), ("neg", 30), ("neu", 10)]);
        let split = split_lines(&lines, &labels, 0.2, 7).unwrap();
        for label in ["pos", "neg", "neu"] {
            let prefix = format!("__label__{label} ");
            let all = labels.iter().filter(|l| *l == label).count() as f64;
            let in_train = split
                .train
                .iter()
                .filter(|line| line.starts_with(&prefix))
                .count() as f64;
            let overall = all / lines.len() as f64;
            let train_fraction = in_train / split.train.len() as f64;
            assert!(
                (train_fraction - overall).abs() < 0.05,
                "label {label}: {train_fraction} vs {overall}"
            );
        }
    }

    #[test]
    fn same_seed_gives_identical_partitions() {
        let (lines, labels) = labeled(&[("pos", 25), ("neg", 25)]);
        let first = split_lines(&lines, &labels, 0.2, 42).unwrap();
        let second = split_lines(&lines, &labels, 0.2, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_move_samples() {
        let (lines, labels) = labeled(&[("pos", 50), ("neg", 50)]);
        let first = split_lines(&lines, &labels, 0.2, 1).unwrap();
        let second = split_lines(&lines, &labels, 0.2, 2).unwrap();
        assert_ne!(first.validation, second.validation);
    }

    #[test]
    fn singleton_class_goes_to_train() {
        let (lines, labels) = labeled(&[("pos", 10), ("rare", 1)]);
        let split = split_lines(&lines, &labels, 0.2, 42).unwrap();
        assert!(split.train.iter().any(|line| line.starts_with("__label__rare ")));
        assert!(!split.validation.iter().any(|line| line.starts_with("__label__rare ")));
    }

    #[test]
    fn infeasible_fraction_is_rejected() {
        // round(2 * 0.2) == 0: the class cannot reach the validation set.
        let (lines, labels) = labeled(&[("pos", 10), ("neg", 2)]);
        let err = split_lines(&lines, &labels, 0.2, 42).unwrap_err();
        assert!(matches!(err, SplitError::InsufficientData { .. }));
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let (lines, labels) = labeled(&[("pos", 4)]);
        for fraction in [0.0, 1.0, -0.5, 1.5] {
            let err = split_lines(&lines, &labels, fraction, 42).unwrap_err();
            assert!(matches!(err, SplitError::InvalidFraction(_)));
        }
    }

    #[test]
    fn writes_both_partitions_to_disk() {
        let dir = tempdir().unwrap();
        let (lines, labels) = labeled(&[("pos", 5), ("neg", 5)]);
        let files = split_to_files(&lines, &labels, 0.2, 42, dir.path()).unwrap();
        let train_text = std::fs::read_to_string(&files.train_path).unwrap();
        let valid_text = std::fs::read_to_string(&files.valid_path).unwrap();
        assert_eq!(train_text.lines().count(), files.result.train.len());
        assert_eq!(valid_text.lines().count(), files.result.validation.len());
    }
}
