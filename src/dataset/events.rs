//! Event labelling and label encoding for training.

use std::collections::BTreeMap;

use super::{DatasetError, INDICATOR_COLUMNS};
use crate::table::{Column, ColumnData, Table};

/// Name of the derived event label column.
pub const EVENT_COLUMN: &str = "event";
/// Label used when no indicator is set.
pub const NORMAL_EVENT: &str = "Normal";
/// Sorted event classes; position is the encoded class index.
pub const EVENT_CLASSES: [&str; 4] = [NORMAL_EVENT, "StartHesitation", "Turn", "Walking"];

/// Add an `event` column naming the first set indicator.
///
/// Indicators are checked in the order `StartHesitation`, `Turn`, `Walking`;
/// rows with none set are `Normal`.
pub fn label_events(table: Table) -> Result<Table, DatasetError> {
    let indicators = INDICATOR_COLUMNS
        .iter()
        .map(|name| table.require(name))
        .collect::<Result<Vec<_>, _>>()?;
    let events: Vec<Option<String>> = (0..table.num_rows())
        .map(|row| {
            let label = indicators
                .iter()
                .find(|column| column.value(row).as_i64() == Some(1))
                .map_or(NORMAL_EVENT, |column| column.name());
            Some(label.to_string())
        })
        .collect();
    Ok(table.with_column(Column::new(EVENT_COLUMN, ColumnData::Text(events)))?)
}

/// Map string labels to dense indices in sorted order.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the distinct labels of `labels`.
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encoder for the four event classes, whether or not all occur.
    pub fn for_events() -> Self {
        Self::fit(EVENT_CLASSES)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform<'a>(
        &self,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<usize>, DatasetError> {
        let index: BTreeMap<&str, usize> = self
            .classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.as_str(), idx))
            .collect();
        labels
            .into_iter()
            .map(|label| {
                index
                    .get(label)
                    .copied()
                    .ok_or_else(|| DatasetError::UnknownLabel(label.to_string()))
            })
            .collect()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

/// Row-major `f32` feature matrix from the named numeric columns.
///
/// Missing cells read as NaN.
pub fn feature_matrix(table: &Table, features: &[&str]) -> Result<Vec<Vec<f32>>, DatasetError> {
    let columns = features
        .iter()
        .map(|name| table.require(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((0..table.num_rows())
        .map(|row| {
            columns
                .iter()
                .map(|column| column.value(row).as_f64().map_or(f32::NAN, |v| v as f32))
                .collect()
        })
        .collect())
}
