//! End-to-end training and submission run.
//!
//! Loads both training families, fits the event classifier on a stratified
//! split, reports held-out precision, and writes predictions for the
//! configured test recordings.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dataset::events::EVENT_COLUMN;
use crate::dataset::{
    DatasetError, FEATURE_COLUMNS, INDICATOR_COLUMNS, LabelEncoder, feature_matrix, label_events,
    load_defog, load_tdcsfog,
};
use crate::ml::gbdt::{GbdtModel, ModelError, TrainDataset, TrainError, train_gbdt};
use crate::ml::metrics::{ConfusionMatrix, accuracy, macro_precision, precision_recall_by_class};
use crate::ml::split::{SplitError, SplitIndices, train_test_split};
use crate::submission::{
    SubmissionError, build_submission, check_against_template, predict_file, write_submission,
};
use crate::table::summary::{render, summarize};
use crate::table::{Table, TableError, Value, concat};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("No test files configured")]
    NoTestFiles,
}

/// Held-out evaluation of the trained model.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub rows: usize,
    pub accuracy: f32,
    pub macro_precision: f32,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub defog_shape: (usize, usize),
    pub tdcsfog_shape: (usize, usize),
    pub train_rows: usize,
    pub evaluation: Evaluation,
    pub submission_rows: usize,
    pub submission_path: PathBuf,
    pub model_path: Option<PathBuf>,
}

/// Run the whole pipeline described by `config`.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome, PipelineError> {
    if config.data.test_files.is_empty() {
        return Err(PipelineError::NoTestFiles);
    }
    let data = &config.data;

    let defog = load_defog(
        &data.resolve(&data.defog_dir),
        &data.resolve(&data.defog_metadata),
    )?;
    for line in render(&defog, &summarize(&defog)).lines() {
        info!("{line}");
    }
    let tdcsfog = load_tdcsfog(
        &data.resolve(&data.tdcsfog_dir),
        &data.resolve(&data.tdcsfog_metadata),
    )?;
    let (rows, columns) = tdcsfog.shape();
    info!("the shape of tdcsfog dataset is ({rows}, {columns})");

    let training = training_table(&defog, &tdcsfog, config.training.include_tdcsfog)?;
    let defog_shape = defog.shape();
    let tdcsfog_shape = tdcsfog.shape();
    drop(defog);
    drop(tdcsfog);

    let labeled = label_events(training)?;
    let encoder = LabelEncoder::for_events();
    let labels = encoder.transform(event_labels(&labeled)?)?;
    let features = feature_matrix(&labeled, &FEATURE_COLUMNS)?;
    drop(labeled);

    let split = train_test_split(
        &labels,
        &config.training.split_seed,
        config.training.test_fraction,
    )?;
    info!(
        "Split {} labelled rows into {} train and {} test rows",
        labels.len(),
        split.train.len(),
        split.test.len()
    );
    let (train, test) = partition(features, labels, &split, encoder.classes());
    let train_rows = train.x.len();

    let model = train_gbdt(&train, &config.training.train_options())?;
    drop(train);
    if let Some(path) = &config.output.model {
        model.save_json(path)?;
        info!("Saved model to {}", path.display());
    }

    let evaluation = evaluate(&model, &test);
    info!("macro precision: {:.4}", evaluation.macro_precision);

    let mut parts = Vec::with_capacity(data.test_files.len());
    for path in &data.test_files {
        parts.push(predict_file(&model, &data.resolve(path))?);
    }
    let submission = build_submission(&parts)?;
    drop(parts);

    if let Some(template) = &data.sample_submission {
        let template = data.resolve(template);
        if template.is_file() {
            check_against_template(&submission, &template)?;
        } else {
            warn!(
                "Sample submission not found at {}; skipping header check",
                template.display()
            );
        }
    }
    write_submission(&submission, &config.output.submission)?;

    Ok(PipelineOutcome {
        defog_shape,
        tdcsfog_shape,
        train_rows,
        evaluation,
        submission_rows: submission.num_rows(),
        submission_path: config.output.submission.clone(),
        model_path: config.output.model.clone(),
    })
}

/// Feature and indicator columns of the rows used for training.
fn training_table(
    defog: &Table,
    tdcsfog: &Table,
    include_tdcsfog: bool,
) -> Result<Table, TableError> {
    let mut keep: Vec<&str> = FEATURE_COLUMNS.to_vec();
    keep.extend(INDICATOR_COLUMNS);
    let defog = defog.select(&keep)?;
    if !include_tdcsfog {
        return Ok(defog);
    }
    concat(&[defog, tdcsfog.select(&keep)?])
}

fn event_labels(table: &Table) -> Result<Vec<&str>, TableError> {
    Ok(table
        .require(EVENT_COLUMN)?
        .data()
        .values()
        .map(|value| match value {
            Value::Text(label) => label,
            _ => "",
        })
        .collect())
}

/// Move each row into the train or test side of `split`.
fn partition(
    features: Vec<Vec<f32>>,
    labels: Vec<usize>,
    split: &SplitIndices,
    classes: &[String],
) -> (TrainDataset, TrainDataset) {
    let mut is_test = vec![false; labels.len()];
    for &row in &split.test {
        is_test[row] = true;
    }
    let empty = || TrainDataset {
        feature_names: FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect(),
        classes: classes.to_vec(),
        x: Vec::new(),
        y: Vec::new(),
    };
    let (mut train, mut test) = (empty(), empty());
    for ((x, y), held_out) in features.into_iter().zip(labels).zip(is_test) {
        let side = if held_out { &mut test } else { &mut train };
        side.x.push(x);
        side.y.push(y);
    }
    (train, test)
}

fn evaluate(model: &GbdtModel, test: &TrainDataset) -> Evaluation {
    if test.x.is_empty() {
        warn!("No held-out rows; skipping evaluation");
        return Evaluation {
            rows: 0,
            accuracy: 0.0,
            macro_precision: 0.0,
        };
    }
    let mut cm = ConfusionMatrix::new(model.classes.len());
    for (x, &truth) in test.x.iter().zip(&test.y) {
        cm.add(truth, model.predict_class_index(x));
    }
    for (class, stats) in model.classes.iter().zip(precision_recall_by_class(&cm)) {
        info!(
            "{class:<16} precision={:.3} recall={:.3} support={}",
            stats.precision, stats.recall, stats.support
        );
    }
    Evaluation {
        rows: test.x.len(),
        accuracy: accuracy(&cm),
        macro_precision: macro_precision(&cm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    fn family(indicator: Vec<i64>) -> Table {
        let rows = indicator.len();
        let mut columns = vec![
            Column::new("Subject", ColumnData::Text(vec![Some("s".into()); rows])),
            Column::new("AccV", ColumnData::Float32(vec![0.5; rows])),
            Column::new("AccML", ColumnData::Float32(vec![0.5; rows])),
            Column::new("AccAP", ColumnData::Float32(vec![0.5; rows])),
        ];
        for name in INDICATOR_COLUMNS {
            columns.push(Column::new(name, ColumnData::Int8(vec![0; rows])));
        }
        Table::new(columns)
            .unwrap()
            .with_column(Column::new("Turn", ColumnData::Int64(indicator)))
            .unwrap()
    }

    #[test]
    fn training_rows_come_from_defog_unless_tdcsfog_is_included() {
        let defog = family(vec![0, 1, 0]);
        let tdcsfog = family(vec![1, 1]);
        let only_defog = training_table(&defog, &tdcsfog, false).unwrap();
        assert_eq!(only_defog.shape(), (3, 6));
        let both = training_table(&defog, &tdcsfog, true).unwrap();
        assert_eq!(both.shape(), (5, 6));
        assert_eq!(both.require("Turn").unwrap().value(3).as_i64(), Some(1));
    }

    #[test]
    fn partition_follows_split_indices() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let split = SplitIndices {
            train: vec![0, 2],
            test: vec![1, 3],
        };
        let classes = vec!["a".to_string(), "b".to_string()];
        let (train, test) = partition(features, vec![0, 1, 0, 1], &split, &classes);
        assert_eq!(train.x, vec![vec![0.0], vec![2.0]]);
        assert_eq!(test.y, vec![1, 1]);
        assert_eq!(test.classes, classes);
    }

    #[test]
    fn event_labels_read_the_event_column() {
        let labeled = label_events(family(vec![0, 1])).unwrap();
        assert_eq!(event_labels(&labeled).unwrap(), vec!["Normal", "Turn"]);
    }
}
