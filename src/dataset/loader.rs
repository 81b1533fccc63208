//! CSV dataset loader for labeled review samples.

use std::path::Path;

use thiserror::Error;

use super::format::LabeledSample;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset must contain '{text_column}' and '{label_column}' columns")]
    MissingColumns {
        text_column: String,
        label_column: String,
    },
    #[error("dataset contains no rows")]
    EmptyDataset,
    #[error("row {row}: missing field")]
    MissingField { row: usize },
}

/// Load `(text, label)` samples from a CSV file with a header row.
///
/// Column names are configurable; both fields are read as strings and the
/// label is trimmed. Row order is preserved.
pub fn load_samples(
    path: &Path,
    text_column: &str,
    label_column: &str,
) -> Result<Vec<LabeledSample>, DataError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let text_idx = headers.iter().position(|header| header == text_column);
    let label_idx = headers.iter().position(|header| header == label_column);
    let (Some(text_idx), Some(label_idx)) = (text_idx, label_idx) else {
        return Err(DataError::MissingColumns {
            text_column: text_column.to_string(),
            label_column: label_column.to_string(),
        });
    };

    let mut samples = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        // idx is zero-based over data rows; report 1-based with the header line.
        let row = idx + 2;
        let text = record
            .get(text_idx)
            .ok_or(DataError::MissingField { row })?;
        let label = record
            .get(label_idx)
            .ok_or(DataError::MissingField { row })?;
        samples.push(LabeledSample {
            text: text.to_string(),
            label: label.trim().to_string(),
        });
    }
    if samples.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_rows_in_order() {
        let (_dir, path) = write_csv("comment,label\nrất tốt,positive\n\"quá tệ, hỏng\",negative\n");
        let samples = load_samples(&path, "comment", "label").unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].text, "rất tốt");
        assert_eq!(samples[0].label, "positive");
        assert_eq!(samples[1].text, "quá tệ, hỏng");
    }

    #[test]
    fn missing_columns_fail_before_rows_are_read() {
        let (_dir, path) = write_csv("comment,rating\nrất tốt,5\n");
        let err = load_samples(&path, "comment", "label").unwrap_err();
        assert!(matches!(err, DataError::MissingColumns { .. }));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let (_dir, path) = write_csv("comment,label\n");
        let err = load_samples(&path, "comment", "label").unwrap_err();
        assert!(matches!(err, DataError::EmptyDataset));
    }

    #[test]
    fn short_row_reports_its_position() {
        let (_dir, path) = write_csv("comment,label\nrất tốt\n");
        let err = load_samples(&path, "comment", "label").unwrap_err();
        assert!(matches!(err, DataError::MissingField { row: 2 }));
    }
}
