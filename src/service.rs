//! Review annotation service backed by a shared loaded model.
//!
//! The review-save hook calls [`annotate`] synchronously for every review
//! with non-empty text. The model is loaded into the process at most once;
//! after that, concurrent predictions read the immutable model without
//! locking.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::Serialize;
use thiserror::Error;

use crate::classifier::{ModelIoError, Prediction, SentimentModel};
use crate::text::{TextNormalizer, select_segmenter};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The model could not be loaded. Raised on every call so review saves
    /// fail loudly instead of silently skipping sentiment tagging.
    #[error("sentiment model not loaded from {path}: {reason}")]
    ModelNotLoaded { path: PathBuf, reason: String },
}

/// Sentiment fields written back onto a review record before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewAnnotation {
    pub sentiment_label: String,
    /// Top-1 confidence rounded to 3 decimal places.
    pub sentiment_score: f32,
}

/// Inference front-end pairing a model with the training-time normalizer.
pub struct SentimentTagger {
    model: SentimentModel,
    normalizer: TextNormalizer,
}

impl SentimentTagger {
    /// The normalizer configuration must match the one used when the model
    /// was trained; a mismatch silently degrades accuracy.
    pub fn new(model: SentimentModel, normalizer: TextNormalizer) -> Self {
        Self { model, normalizer }
    }

    /// Load a saved model and pair it with a segmenter for `lexicon_path`.
    pub fn load(model_path: &Path, lexicon_path: Option<&Path>) -> Result<Self, ModelIoError> {
        let model = SentimentModel::load(model_path)?;
        Ok(Self::new(
            model,
            TextNormalizer::new(select_segmenter(lexicon_path)),
        ))
    }

    /// Classify raw review text with the same normalization used at training
    /// time.
    pub fn predict(&self, raw_text: &str) -> Prediction {
        self.model.predict(&self.normalizer.normalize(raw_text))
    }

    /// Annotation written onto the review record.
    pub fn annotate(&self, raw_text: &str) -> ReviewAnnotation {
        let prediction = self.predict(raw_text);
        ReviewAnnotation {
            sentiment_label: prediction.label,
            sentiment_score: round3(prediction.confidence),
        }
    }
}

static SHARED_TAGGER: OnceLock<SentimentTagger> = OnceLock::new();
static LOAD_GUARD: Mutex<()> = Mutex::new(());

/// Process-wide tagger, loaded at most once.
///
/// Concurrent first uses serialize on the load guard; once initialized, every
/// call returns the shared instance without locking.
pub fn shared_tagger(
    model_path: &Path,
    lexicon_path: Option<&Path>,
) -> Result<&'static SentimentTagger, ServiceError> {
    if let Some(tagger) = SHARED_TAGGER.get() {
        return Ok(tagger);
    }
    let _guard = LOAD_GUARD.lock().map_err(|_| not_loaded(model_path, "load guard poisoned"))?;
    if SHARED_TAGGER.get().is_none() {
        let tagger = SentimentTagger::load(model_path, lexicon_path)
            .map_err(|err| not_loaded(model_path, &err.to_string()))?;
        let _ = SHARED_TAGGER.set(tagger);
    }
    SHARED_TAGGER
        .get()
        .ok_or_else(|| not_loaded(model_path, "initialization raced"))
}

/// Annotate review text via the shared tagger.
///
/// Intended for the pre-save hook; callers skip invocation when the review
/// body is empty. Normalization degradation never fails this call, but a
/// missing model does, on every call.
pub fn annotate(
    model_path: &Path,
    lexicon_path: Option<&Path>,
    raw_text: &str,
) -> Result<ReviewAnnotation, ServiceError> {
    Ok(shared_tagger(model_path, lexicon_path)?.annotate(raw_text))
}

fn not_loaded(path: &Path, reason: &str) -> ServiceError {
    ServiceError::ModelNotLoaded {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Loss, TrainOptions, train};
    use tempfile::tempdir;

    fn trained_tagger(dir: &tempfile::TempDir) -> SentimentTagger {
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
        let model = train(&train_path, &options).unwrap();
        SentimentTagger::new(model, TextNormalizer::passthrough())
    }

    #[test]
    fn annotation_rounds_to_three_decimals() {
        let dir = tempdir().unwrap();
        let tagger = trained_tagger(&dir);
        let annotation = tagger.annotate("RẤT   tốt");
        assert_eq!(annotation.sentiment_label, "pos");
        assert!((0.0..=1.0).contains(&annotation.sentiment_score));
        let scaled = annotation.sentiment_score * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-3);
    }

    #[test]
    fn raw_text_is_normalized_before_prediction() {
        let dir = tempdir().unwrap();
        let tagger = trained_tagger(&dir);
        let messy = tagger.predict("  QUÁ\t\ttệ \n");
        let clean = tagger.predict("quá tệ");
        assert_eq!(messy, clean);
    }

    #[test]
    fn missing_model_fails_loudly_on_every_call() {
        let path = Path::new("/nonexistent/sentiment_model.bin");
        for _ in 0..2 {
            let err = annotate(path, None, "rất tốt").unwrap_err();
            assert!(matches!(err, ServiceError::ModelNotLoaded { .. }));
        }
    }
}
