//! Columnar in-memory tables for sensor recordings and their metadata.
//!
//! A [`Table`] is an ordered list of named, equally long [`Column`]s. Storage
//! is typed per column ([`ColumnData`]) so the memory optimizer can swap a
//! column's representation without touching its values.

mod categorical;
mod column;
pub mod csv;
mod ops;
pub mod summary;

use std::collections::HashSet;

use thiserror::Error;

pub use categorical::{Categorical, Codes, Dictionary};
pub use column::{Column, ColumnData, ColumnKind, Value};
pub use ops::{concat, inner_join};

/// Errors raised by table construction and row/column operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// A column's length differs from the table's row count.
    #[error("Column {column} has {found} rows but the table has {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    /// Two columns share a name.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
    /// A referenced column does not exist.
    #[error("Missing column: {0}")]
    MissingColumn(String),
    /// A row mask does not match the table length.
    #[error("Row mask has {found} entries but the table has {expected} rows")]
    MaskLength { expected: usize, found: usize },
    /// Concatenation was asked to join zero tables.
    #[error("Nothing to concatenate")]
    EmptyConcat,
    /// Concatenated tables disagree on their column names.
    #[error("Column sets differ: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Ordered collection of named columns with a uniform row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, validating row counts and column-name uniqueness.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn(column.name().to_string()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            for column in &columns {
                if column.len() != expected {
                    return Err(TableError::RowCountMismatch {
                        column: column.name().to_string(),
                        expected,
                        found: column.len(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }

    /// Like [`Table::column`] but missing columns are an error.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Total footprint of every column in bytes.
    pub fn memory_usage(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.data().memory_usage())
            .sum()
    }

    /// Add a column, replacing an existing one with the same name in place.
    pub fn with_column(mut self, column: Column) -> Result<Self, TableError> {
        if !self.columns.is_empty() && column.len() != self.num_rows() {
            return Err(TableError::RowCountMismatch {
                column: column.name().to_string(),
                expected: self.num_rows(),
                found: column.len(),
            });
        }
        match self
            .columns
            .iter()
            .position(|existing| existing.name() == column.name())
        {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    /// Rows picked by index, in the order given.
    pub fn take(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| Column::new(column.name(), column.data().take(indices)))
            .collect();
        Table { columns }
    }

    /// Keep rows whose mask entry is `true`.
    pub fn filter(&self, mask: &[bool]) -> Result<Table, TableError> {
        if mask.len() != self.num_rows() {
            return Err(TableError::MaskLength {
                expected: self.num_rows(),
                found: mask.len(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect();
        Ok(self.take(&indices))
    }

    /// Columns in the order named.
    pub fn select(&self, names: &[&str]) -> Result<Table, TableError> {
        let columns = names
            .iter()
            .map(|name| self.require(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Table::new(columns)
    }

    /// Every column except those named. Naming a missing column is an error.
    pub fn drop_columns(&self, names: &[&str]) -> Result<Table, TableError> {
        for name in names {
            self.require(name)?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|column| !names.contains(&column.name()))
            .cloned()
            .collect();
        Ok(Table { columns })
    }

    /// Construct without validation; callers guarantee the invariants.
    pub(crate) fn from_columns_unchecked(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::new("Time", ColumnData::Int64(vec![0, 1, 2])),
            Column::new("AccV", ColumnData::Float64(vec![0.5, -0.25, 1.0])),
            Column::new(
                "file",
                ColumnData::Text(vec![Some("a".into()), Some("a".into()), Some("b".into())]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::new("a", ColumnData::Int64(vec![1, 2])),
            Column::new("b", ColumnData::Int64(vec![1])),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::RowCountMismatch { found: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Table::new(vec![
            Column::new("a", ColumnData::Int64(vec![1])),
            Column::new("a", ColumnData::Int64(vec![2])),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn filter_keeps_masked_rows() {
        let filtered = sample().filter(&[true, false, true]).unwrap();
        assert_eq!(filtered.num_rows(), 2);
        assert_eq!(
            filtered.require("Time").unwrap().data(),
            &ColumnData::Int64(vec![0, 2])
        );
    }

    #[test]
    fn select_and_drop_respect_names() {
        let table = sample();
        let selected = table.select(&["file", "Time"]).unwrap();
        assert_eq!(selected.column_names(), vec!["file", "Time"]);
        let dropped = table.drop_columns(&["AccV"]).unwrap();
        assert_eq!(dropped.column_names(), vec!["Time", "file"]);
        assert!(table.drop_columns(&["Missing"]).is_err());
    }

    #[test]
    fn with_column_replaces_existing() {
        let table = sample()
            .with_column(Column::new("Time", ColumnData::Int8(vec![5, 6, 7])))
            .unwrap();
        assert_eq!(table.num_columns(), 3);
        assert_eq!(table.column_names()[0], "Time");
        assert_eq!(table.require("Time").unwrap().data().dtype_name(), "int8");
    }
}
