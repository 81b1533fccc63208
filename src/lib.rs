//! Review sentiment classification pipeline.
//!
//! Trains a compact subword-aware linear classifier from labeled review text
//! and serves single-sample predictions back to the review-save hook.

/// Subword-aware linear classifier: model, training, evaluation.
pub mod classifier;
/// Pipeline configuration loaded from TOML and the environment.
pub mod config;
/// Dataset loading, line formatting, and stratified splitting.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Sequential pipeline orchestration.
pub mod pipeline;
/// Review annotation service backed by a shared loaded model.
pub mod service;
/// Text normalization and word segmentation.
pub mod text;
