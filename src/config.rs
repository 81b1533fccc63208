//! Pipeline configuration loaded from TOML with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::TrainOptions;

/// Environment variable naming a TOML config file to load when no explicit
/// path is given.
pub const CONFIG_ENV_VAR: &str = "SENTIGRAM_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Full configuration surface for a pipeline run.
///
/// Every field has a default; a TOML file overrides the defaults and
/// `SENTIGRAM_*` environment variables override the file for the operational
/// paths and column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV dataset with one labeled sample per row.
    pub input_path: PathBuf,
    /// Destination for `train.txt`, `valid.txt`, and the model artifact.
    pub output_dir: PathBuf,
    pub text_column: String,
    pub label_column: String,
    /// Share of each class routed to validation, in (0, 1).
    pub validation_fraction: f64,
    /// Seed for the stratified split.
    pub seed: u64,
    pub model_file_name: String,
    /// Multi-word phrase lexicon for the segmenter; `None` or unreadable
    /// selects the passthrough segmenter.
    pub lexicon_path: Option<PathBuf>,
    /// Optional text classified at the end of a run as a smoke check.
    pub demo_text: Option<String>,
    pub training: TrainOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("reviews.csv"),
            output_dir: PathBuf::from("out"),
            text_column: "comment".to_string(),
            label_column: "label".to_string(),
            validation_fraction: 0.2,
            seed: 42,
            model_file_name: "sentiment_model.bin".to_string(),
            lexicon_path: None,
            demo_text: None,
            training: TrainOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Resolve configuration from an optional file path, the `SENTIGRAM_CONFIG`
    /// environment variable, or defaults, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(value) => Self::from_file(Path::new(&value))?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Full path of the model artifact inside the output directory.
    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(&self.model_file_name)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("SENTIGRAM_INPUT") {
            self.input_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("SENTIGRAM_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("SENTIGRAM_TEXT_COLUMN") {
            self.text_column = value;
        }
        if let Ok(value) = std::env::var("SENTIGRAM_LABEL_COLUMN") {
            self.label_column = value;
        }
        if let Ok(value) = std::env::var("SENTIGRAM_MODEL_FILE") {
            self.model_file_name = value;
        }
        if let Ok(value) = std::env::var("SENTIGRAM_LEXICON") {
            self.lexicon_path = Some(PathBuf::from(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Loss;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = PipelineConfig::default();
        assert_eq!(config.text_column, "comment");
        assert_eq!(config.label_column, "label");
        assert_eq!(config.validation_fraction, 0.2);
        assert_eq!(config.model_file_name, "sentiment_model.bin");
        assert_eq!(config.training.epochs, 10);
        assert_eq!(config.training.loss, Loss::HierarchicalSoftmax);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sentigram.toml");
        std::fs::write(
            &path,
            r#"
input_path = "data/aivivn.csv"
validation_fraction = 0.1

[training]
epochs = 20
loss = "softmax"
"#,
        )
        .unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.input_path, PathBuf::from("data/aivivn.csv"));
        assert_eq!(config.validation_fraction, 0.1);
        assert_eq!(config.training.epochs, 20);
        assert_eq!(config.training.loss, Loss::Softmax);
        // untouched fields keep their defaults
        assert_eq!(config.text_column, "comment");
        assert_eq!(config.training.embedding_dim, 100);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sentigram.toml");
        std::fs::write(&path, "validation_fraction = \"lots\"").unwrap();
        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn model_path_joins_output_dir() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("/tmp/run"),
            model_file_name: "m.bin".to_string(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.model_path(), PathBuf::from("/tmp/run/m.bin"));
    }
}
