use std::collections::HashMap;

use super::{Column, ColumnData, ColumnKind, Table, TableError, Value};

/// Concatenate tables row-wise in a single pass.
///
/// Every table must carry the same column names as the first one; columns are
/// matched by name and emitted in the first table's order. Mixed integer and
/// float storage is promoted to `Float64`, any other mixture to `Text`.
pub fn concat(tables: &[Table]) -> Result<Table, TableError> {
    let first = tables.first().ok_or(TableError::EmptyConcat)?;
    let mut expected: Vec<String> = first.column_names().into_iter().map(String::from).collect();
    expected.sort();
    for table in &tables[1..] {
        let mut found: Vec<String> = table.column_names().into_iter().map(String::from).collect();
        found.sort();
        if found != expected {
            return Err(TableError::SchemaMismatch { expected, found });
        }
    }

    let mut columns = Vec::with_capacity(first.num_columns());
    for column in first.columns() {
        let parts: Vec<&ColumnData> = tables
            .iter()
            .map(|table| table.require(column.name()).map(Column::data))
            .collect::<Result<_, _>>()?;
        columns.push(Column::new(column.name(), concat_column(&parts)));
    }
    Ok(Table::from_columns_unchecked(columns))
}

fn concat_column(parts: &[&ColumnData]) -> ColumnData {
    let mut merged = parts[0].clone();
    if parts[1..].iter().all(|part| merged.try_append(part)) {
        return merged;
    }
    let numeric = parts
        .iter()
        .all(|part| matches!(part.kind(), ColumnKind::Integer | ColumnKind::Float));
    if numeric {
        ColumnData::Float64(parts.iter().flat_map(|part| part.to_f64_lossy()).collect())
    } else {
        ColumnData::Text(parts.iter().flat_map(|part| part.to_text()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Int(i64),
    Float(u64),
    Text(String),
}

impl JoinKey {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(v) | Value::Timestamp(v) => Some(JoinKey::Int(v)),
            Value::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Some(JoinKey::Int(v as i64))
            }
            Value::Float(v) => Some(JoinKey::Float(v.to_bits())),
            Value::Bool(v) => Some(JoinKey::Int(v as i64)),
            Value::Text(v) => Some(JoinKey::Text(v.to_string())),
        }
    }
}

/// Inner join on `left_on == right_on`.
///
/// Output rows follow the left table's order, each expanded by its matching
/// right rows in their original order. Left columns come first, then right
/// columns; a shared key name is emitted once and other name clashes get
/// `_x`/`_y` suffixes. Missing keys never match.
pub fn inner_join(
    left: &Table,
    right: &Table,
    left_on: &str,
    right_on: &str,
) -> Result<Table, TableError> {
    let left_key = left.require(left_on)?;
    let right_key = right.require(right_on)?;

    let mut lookup: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (row, value) in right_key.data().values().enumerate() {
        if let Some(key) = JoinKey::from_value(value) {
            lookup.entry(key).or_default().push(row);
        }
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (row, value) in left_key.data().values().enumerate() {
        let Some(matches) = JoinKey::from_value(value).and_then(|key| lookup.get(&key)) else {
            continue;
        };
        for &matched in matches {
            left_rows.push(row);
            right_rows.push(matched);
        }
    }

    let shared_key = left_on == right_on;
    let right_names: Vec<&str> = right
        .column_names()
        .into_iter()
        .filter(|name| !(shared_key && *name == right_on))
        .collect();
    let left_names = left.column_names();

    let mut columns = Vec::with_capacity(left.num_columns() + right_names.len());
    for column in left.columns() {
        let clash = right_names.contains(&column.name());
        let name = if clash {
            format!("{}_x", column.name())
        } else {
            column.name().to_string()
        };
        columns.push(Column::new(name, column.data().take(&left_rows)));
    }
    for column in right.columns() {
        if shared_key && column.name() == right_on {
            continue;
        }
        let clash = left_names.contains(&column.name());
        let name = if clash {
            format!("{}_y", column.name())
        } else {
            column.name().to_string()
        };
        columns.push(Column::new(name, column.data().take(&right_rows)));
    }
    Table::new(columns)
}
