//! Sequential pipeline orchestration from raw CSV to saved model.
//!
//! Stages run strictly in order, each consuming the prior stage's complete
//! output. The first failing stage aborts the run with its error surfaced
//! unmodified; a caller-supplied cancellation token is checked between (not
//! within) stages.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classifier::{
    EvalError, EvaluationResult, ModelIoError, Prediction, TrainError, evaluate, train,
};
use crate::config::PipelineConfig;
use crate::dataset::{DataError, SplitError, format_line, load_samples, split_to_files};
use crate::text::{TextNormalizer, select_segmenter};

/// Cooperative cancellation flag checked between pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("failed to save model to {path}: {source}")]
    SaveModel {
        path: PathBuf,
        source: ModelIoError,
    },
    #[error("pipeline cancelled before stage '{stage}'")]
    Cancelled { stage: &'static str },
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub rows_loaded: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub evaluation: EvaluationResult,
    pub demo_prediction: Option<Prediction>,
    pub model_path: PathBuf,
}

/// Run the full pipeline: load, normalize, format, split, train, evaluate,
/// optional demo prediction, persist.
///
/// Re-running with the same input, output directory, and seeds overwrites the
/// prior artifacts with identical results.
pub fn run(config: &PipelineConfig, cancel: &CancelToken) -> Result<PipelineReport, PipelineError> {
    let normalizer = TextNormalizer::new(select_segmenter(config.lexicon_path.as_deref()));
    info!(segmenter = normalizer.segmenter_name(), "pipeline starting");

    check(cancel, "load")?;
    info!(path = %config.input_path.display(), "loading dataset");
    let samples = load_samples(&config.input_path, &config.text_column, &config.label_column)?;
    info!(rows = samples.len(), "dataset loaded");

    check(cancel, "normalize")?;
    info!("normalizing and formatting samples");
    let mut lines = Vec::with_capacity(samples.len());
    let mut labels = Vec::with_capacity(samples.len());
    for sample in &samples {
        let text = normalizer.normalize(&sample.text);
        lines.push(format_line(&sample.label, &text));
        labels.push(sample.label.clone());
    }

    check(cancel, "split")?;
    info!(
        fraction = config.validation_fraction,
        seed = config.seed,
        "splitting train/validation"
    );
    let split = split_to_files(
        &lines,
        &labels,
        config.validation_fraction,
        config.seed,
        &config.output_dir,
    )?;
    info!(
        train = split.result.train.len(),
        validation = split.result.validation.len(),
        "split persisted"
    );

    check(cancel, "train")?;
    info!(
        epochs = config.training.epochs,
        loss = ?config.training.loss,
        "training classifier"
    );
    let model = train(&split.train_path, &config.training)?;
    info!(
        vocab = model.vocab.len(),
        labels = model.labels.len(),
        "training complete"
    );

    check(cancel, "evaluate")?;
    let evaluation = evaluate(&model, &split.valid_path)?;
    info!(
        samples = evaluation.sample_count,
        precision_at_1 = evaluation.precision_at_1,
        recall_at_1 = evaluation.recall_at_1,
        "evaluation complete"
    );

    let demo_prediction = config.demo_text.as_ref().map(|text| {
        let prediction = model.predict(&normalizer.normalize(text));
        info!(
            label = %prediction.label,
            confidence = prediction.confidence,
            "demo prediction"
        );
        prediction
    });

    check(cancel, "save")?;
    let model_path = config.model_path();
    model
        .save(&model_path)
        .map_err(|source| PipelineError::SaveModel {
            path: model_path.clone(),
            source,
        })?;
    info!(path = %model_path.display(), "model saved");

    Ok(PipelineReport {
        rows_loaded: samples.len(),
        train_samples: split.result.train.len(),
        validation_samples: split.result.validation.len(),
        evaluation,
        demo_prediction,
        model_path,
    })
}

fn check(cancel: &CancelToken, stage: &'static str) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_token_stops_before_the_first_stage() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let config = PipelineConfig::default();
        let err = run(&config, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { stage: "load" }));
    }

    #[test]
    fn missing_input_surfaces_the_data_error() {
        let config = PipelineConfig {
            input_path: "/nonexistent/reviews.csv".into(),
            ..PipelineConfig::default()
        };
        let err = run(&config, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }
}
