//! Per-column overview of a table: storage, gaps, cardinality, range, and a
//! peek at the first rows.

use std::collections::HashSet;
use std::fmt::Write as _;

use super::{ColumnData, ColumnKind, Table};

/// Summary of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: &'static str,
    pub missing: usize,
    /// `missing / rows`, zero for an empty table.
    pub missing_share: f64,
    /// Distinct non-missing values.
    pub unique: usize,
    /// Smallest value of a numeric column.
    pub min: Option<f64>,
    /// Largest value of a numeric column.
    pub max: Option<f64>,
    /// Up to three leading values rendered as text.
    pub first_values: Vec<String>,
}

/// One summary entry per column, in column order.
pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    let rows = table.num_rows();
    table
        .columns()
        .iter()
        .map(|column| {
            let data = column.data();
            let missing = data.values().filter(|value| value.is_null()).count();
            let (min, max) = numeric_range(data);
            ColumnSummary {
                name: column.name().to_string(),
                dtype: data.dtype_name(),
                missing,
                missing_share: if rows == 0 {
                    0.0
                } else {
                    missing as f64 / rows as f64
                },
                unique: unique_count(data),
                min,
                max,
                first_values: data.values().take(3).map(|value| value.to_string()).collect(),
            }
        })
        .collect()
}

/// Render summaries as an aligned text block.
pub fn render(table: &Table, summaries: &[ColumnSummary]) -> String {
    let (rows, columns) = table.shape();
    let mut out = format!("data shape: ({rows}, {columns})\n");
    let name_width = summaries
        .iter()
        .map(|summary| summary.name.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let _ = writeln!(
        out,
        "{:<name_width$}  {:<14}  {:>8}  {:>8}  {:>8}  {:>12}  {:>12}  first values",
        "column", "data type", "#missing", "%missing", "#unique", "min", "max"
    );
    for summary in summaries {
        let fmt_bound = |bound: Option<f64>| bound.map_or_else(String::new, |v| format!("{v:.4}"));
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<14}  {:>8}  {:>8.4}  {:>8}  {:>12}  {:>12}  {}",
            summary.name,
            summary.dtype,
            summary.missing,
            summary.missing_share,
            summary.unique,
            fmt_bound(summary.min),
            fmt_bound(summary.max),
            summary.first_values.join(" | ")
        );
    }
    out
}

fn numeric_range(data: &ColumnData) -> (Option<f64>, Option<f64>) {
    if !matches!(data.kind(), ColumnKind::Integer | ColumnKind::Float) {
        return (None, None);
    }
    data.values()
        .filter_map(|value| value.as_f64())
        .fold((None, None), |(min, max): (Option<f64>, Option<f64>), v| {
            (
                Some(min.map_or(v, |m| m.min(v))),
                Some(max.map_or(v, |m| m.max(v))),
            )
        })
}

fn unique_count(data: &ColumnData) -> usize {
    match data {
        ColumnData::Text(values) => values.iter().flatten().collect::<HashSet<_>>().len(),
        ColumnData::Categorical(cat) => {
            let used: HashSet<i32> = (0..cat.len())
                .map(|row| cat.codes().get(row))
                .filter(|&code| code >= 0)
                .collect();
            used.len()
        }
        ColumnData::Float16(_) | ColumnData::Float32(_) | ColumnData::Float64(_) => data
            .values()
            .filter_map(|value| value.as_f64())
            .map(|v| if v == 0.0 { 0u64 } else { v.to_bits() })
            .collect::<HashSet<_>>()
            .len(),
        _ => data
            .values()
            .filter_map(|value| match value {
                super::Value::Timestamp(v) => Some(v),
                other => other.as_i64(),
            })
            .collect::<HashSet<_>>()
            .len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn summarizes_numeric_and_text_columns() {
        let table = Table::new(vec![
            Column::new("AccV", ColumnData::Float64(vec![1.0, f64::NAN, -2.0, 1.0])),
            Column::new(
                "Id",
                ColumnData::Text(vec![
                    Some("a".into()),
                    Some("b".into()),
                    None,
                    Some("a".into()),
                ]),
            ),
        ])
        .unwrap();
        let summary = summarize(&table);
        assert_eq!(summary[0].missing, 1);
        assert_eq!(summary[0].unique, 2);
        assert_eq!(summary[0].min, Some(-2.0));
        assert_eq!(summary[0].max, Some(1.0));
        assert_eq!(summary[0].first_values, vec!["1", "", "-2"]);
        assert_eq!(summary[1].dtype, "object");
        assert_eq!(summary[1].unique, 2);
        assert!((summary[1].missing_share - 0.25).abs() < 1e-12);
        assert_eq!(summary[1].min, None);

        let text = render(&table, &summary);
        assert!(text.starts_with("data shape: (4, 2)"));
        assert!(text.contains("AccV"));
    }
}
