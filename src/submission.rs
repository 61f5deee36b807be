//! Competition submission assembly.
//!
//! Each test recording is predicted row by row; the winning class is expanded
//! into three 0/1 indicator columns keyed by `{recording_id}_{Time}`.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::dataset::{DatasetError, INDICATOR_COLUMNS, feature_matrix};
use crate::ml::gbdt::GbdtModel;
use crate::table::csv::{CsvError, read_csv, read_csv_header, write_csv};
use crate::table::{Column, ColumnData, Table, TableError, concat};

/// Submission key column.
pub const ID_COLUMN: &str = "Id";
/// Sample time column in test recordings.
pub const TIME_COLUMN: &str = "Time";
/// Predicted class index column kept on per-recording predictions.
pub const PREDICTED_EVENT_COLUMN: &str = "event";
/// Exact submission layout.
pub const SUBMISSION_COLUMNS: [&str; 4] = [ID_COLUMN, "StartHesitation", "Turn", "Walking"];

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The submission's columns differ from the sample template.
    #[error("Submission columns {found:?} do not match template columns {expected:?}")]
    TemplateMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Predict one test recording.
///
/// The result holds `Id`, the predicted class index, and one indicator column
/// per event type with at most one indicator set per row.
pub fn predict_recording(
    model: &GbdtModel,
    table: &Table,
    recording_id: &str,
) -> Result<Table, SubmissionError> {
    let time = table.require(TIME_COLUMN)?;
    let feature_names: Vec<&str> = model.feature_names.iter().map(String::as_str).collect();
    let features = feature_matrix(table, &feature_names)?;

    let rows = table.num_rows();
    let mut ids = Vec::with_capacity(rows);
    let mut predicted = Vec::with_capacity(rows);
    let mut indicators: Vec<Vec<i8>> = vec![Vec::with_capacity(rows); INDICATOR_COLUMNS.len()];
    for (row, x) in features.iter().enumerate() {
        ids.push(Some(format!("{recording_id}_{}", time.value(row))));
        let class_idx = model.predict_class_index(x);
        predicted.push(class_idx as i64);
        let class_name = model.classes.get(class_idx).map(String::as_str);
        for (indicator, values) in INDICATOR_COLUMNS.iter().zip(indicators.iter_mut()) {
            values.push(i8::from(class_name == Some(*indicator)));
        }
    }

    let mut columns = vec![
        Column::new(ID_COLUMN, ColumnData::Text(ids)),
        Column::new(PREDICTED_EVENT_COLUMN, ColumnData::Int64(predicted)),
    ];
    for (name, values) in INDICATOR_COLUMNS.iter().zip(indicators) {
        columns.push(Column::new(*name, ColumnData::Int8(values)));
    }
    Ok(Table::new(columns)?)
}

/// Read a test recording and predict it, keyed by the file stem.
pub fn predict_file(model: &GbdtModel, path: &Path) -> Result<Table, SubmissionError> {
    let table = read_csv(path)?;
    let recording_id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let predictions = predict_recording(model, &table, recording_id)?;
    info!(
        "Predicted {} rows for test recording {recording_id}",
        predictions.num_rows()
    );
    Ok(predictions)
}

/// Concatenate per-recording predictions once and keep the submission columns.
pub fn build_submission(parts: &[Table]) -> Result<Table, SubmissionError> {
    let combined = concat(parts)?;
    Ok(combined.select(&SUBMISSION_COLUMNS)?)
}

/// Compare the submission's columns with a sample submission's header.
pub fn check_against_template(table: &Table, template: &Path) -> Result<(), SubmissionError> {
    let expected = read_csv_header(template)?;
    let found: Vec<String> = table.column_names().into_iter().map(String::from).collect();
    if expected != found {
        return Err(SubmissionError::TemplateMismatch { expected, found });
    }
    Ok(())
}

/// Write the submission CSV.
pub fn write_submission(table: &Table, path: &Path) -> Result<(), SubmissionError> {
    write_csv(table, path)?;
    info!(
        "Wrote submission with {} rows to {}",
        table.num_rows(),
        path.display()
    );
    Ok(())
}
