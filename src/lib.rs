//! Library exports for the gait freezing pipeline, its binaries, benches, and tests.
/// Application directory helpers.
pub mod app_dirs;
/// TOML pipeline configuration.
pub mod config;
/// Sensor recording discovery, family loaders, and event labels.
pub mod dataset;
/// Logging initialization.
pub mod logging;
/// Classifier training, evaluation, and splitting.
pub mod ml;
/// Column storage narrowing for tables.
pub mod optimize;
/// End-to-end training and submission run.
pub mod pipeline;
/// Competition submission assembly.
pub mod submission;
/// Columnar tables, CSV IO, and summaries.
pub mod table;
