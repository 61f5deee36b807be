//! Deterministic gradient-boosted tree classifier.
//!
//! Multi-class classification via softmax boosting, with one depth-limited
//! regression tree per class per round. Models round-trip through JSON.

mod model;
mod train;
mod tree;

use std::path::PathBuf;

use thiserror::Error;

pub use model::{GbdtModel, MODEL_VERSION, argmax, softmax};
pub use train::{TrainDataset, TrainOptions, train_gbdt};
pub use tree::{RegressionTree, TreeNode};

/// Errors raised while training a model.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Mismatched X/Y lengths: {x} feature rows, {y} labels")]
    LengthMismatch { x: usize, y: usize },
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Need at least 2 classes, got {0}")]
    TooFewClasses(usize),
}

/// Errors raised while validating, saving, or loading a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid model: {0}")]
    Invalid(String),
    #[error("Failed to access model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
