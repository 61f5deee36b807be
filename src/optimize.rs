//! Memory-footprint reduction for loaded tables.
//!
//! Each column is rewritten to the narrowest storage that still holds its
//! observed range:
//! - text and other non-numeric columns become dictionary-encoded categoricals,
//! - timestamps and existing categoricals are left alone,
//! - integers move to the narrowest of 8/16/32/64-bit signed storage,
//! - floats move to the narrowest of half/single/double precision.
//!
//! Range tests are strict on both ends, so a value sitting exactly on a
//! width's limit pushes the column to the next wider width. Float narrowing
//! only checks the range, so precision loss is accepted silently.

use std::any::{Any, TypeId};

use half::f16;
use thiserror::Error;
use tracing::info;

use crate::table::{Categorical, Column, ColumnData, ColumnKind, Table};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The input is not a [`Table`].
    #[error("Input must be a table, got a value of {found:?}")]
    TypeMismatch { found: TypeId },
}

/// Signed integer storage widths, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub const ASCENDING: [IntWidth; 4] =
        [IntWidth::I8, IntWidth::I16, IntWidth::I32, IntWidth::I64];

    /// Representable `(min, max)`.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::I8 => (i8::MIN as i64, i8::MAX as i64),
            IntWidth::I16 => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::I32 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::I64 => (i64::MIN, i64::MAX),
        }
    }

    fn of(data: &ColumnData) -> Option<Self> {
        match data {
            ColumnData::Int8(_) => Some(IntWidth::I8),
            ColumnData::Int16(_) => Some(IntWidth::I16),
            ColumnData::Int32(_) => Some(IntWidth::I32),
            ColumnData::Int64(_) => Some(IntWidth::I64),
            _ => None,
        }
    }
}

/// Floating-point storage widths, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FloatWidth {
    F16,
    F32,
    F64,
}

impl FloatWidth {
    pub const ASCENDING: [FloatWidth; 3] = [FloatWidth::F16, FloatWidth::F32, FloatWidth::F64];

    /// Finite representable `(min, max)`.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            FloatWidth::F16 => (f16::MIN.to_f64(), f16::MAX.to_f64()),
            FloatWidth::F32 => (f32::MIN as f64, f32::MAX as f64),
            FloatWidth::F64 => (f64::MIN, f64::MAX),
        }
    }

    fn of(data: &ColumnData) -> Option<Self> {
        match data {
            ColumnData::Float16(_) => Some(FloatWidth::F16),
            ColumnData::Float32(_) => Some(FloatWidth::F32),
            ColumnData::Float64(_) => Some(FloatWidth::F64),
            _ => None,
        }
    }
}

/// Narrowest integer width whose open range contains `[min, max]`.
pub fn narrowest_int_width(min: i64, max: i64) -> IntWidth {
    IntWidth::ASCENDING[..3]
        .iter()
        .copied()
        .find(|width| {
            let (lo, hi) = width.bounds();
            min > lo && max < hi
        })
        .unwrap_or(IntWidth::I64)
}

/// Narrowest float width whose open range contains `[min, max]`.
pub fn narrowest_float_width(min: f64, max: f64) -> FloatWidth {
    FloatWidth::ASCENDING[..2]
        .iter()
        .copied()
        .find(|width| {
            let (lo, hi) = width.bounds();
            min > lo && max < hi
        })
        .unwrap_or(FloatWidth::F64)
}

/// Footprint before and after optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub before_bytes: usize,
    pub after_bytes: usize,
}

impl MemoryReport {
    pub fn before_mb(&self) -> f64 {
        self.before_bytes as f64 / BYTES_PER_MB
    }

    pub fn after_mb(&self) -> f64 {
        self.after_bytes as f64 / BYTES_PER_MB
    }

    /// Reduction relative to the starting footprint; zero for an empty table.
    pub fn reduction_percent(&self) -> f64 {
        if self.before_bytes == 0 {
            return 0.0;
        }
        100.0 * (self.before_bytes as f64 - self.after_bytes as f64) / self.before_bytes as f64
    }
}

/// Type-checked entry point for callers holding an arbitrary value.
///
/// Anything other than a [`Table`] is rejected before a column is touched. A
/// boxed value is looked through, so `&Box<dyn Any>` holding a table works.
pub fn reduce_memory_usage_any(input: &dyn Any) -> Result<(Table, MemoryReport), OptimizeError> {
    let input = match input.downcast_ref::<Box<dyn Any>>() {
        Some(boxed) => boxed.as_ref(),
        None => input,
    };
    let table = input
        .downcast_ref::<Table>()
        .ok_or(OptimizeError::TypeMismatch {
            found: Any::type_id(input),
        })?;
    Ok(reduce_memory_usage(table))
}

/// Narrow every column of `table` and return an independent optimized copy.
pub fn reduce_memory_usage(table: &Table) -> (Table, MemoryReport) {
    let before_bytes = table.memory_usage();
    info!(
        "Memory usage of table is {:.2} MB",
        before_bytes as f64 / BYTES_PER_MB
    );

    let columns: Vec<Column> = table.columns().iter().map(optimize_column).collect();
    let optimized = Table::from_columns_unchecked(columns);

    let report = MemoryReport {
        before_bytes,
        after_bytes: optimized.memory_usage(),
    };
    info!("Memory usage after optimization is: {:.2} MB", report.after_mb());
    info!("Decreased by {:.1}%", report.reduction_percent());
    (optimized, report)
}

/// Narrowed copy of a single column.
pub fn optimize_column(column: &Column) -> Column {
    let data = column.data();
    let optimized = match data.kind() {
        ColumnKind::Timestamp => data.clone(),
        ColumnKind::Integer => narrow_integers(data),
        ColumnKind::Float => narrow_floats(data),
        ColumnKind::Categorical | ColumnKind::Other => to_categorical(data),
    };
    Column::new(column.name(), optimized)
}

fn narrow_integers(data: &ColumnData) -> ColumnData {
    let Some(current) = IntWidth::of(data) else {
        return data.clone();
    };
    let values: Vec<i64> = data.values().filter_map(|value| value.as_i64()).collect();
    let Some((min, max)) = min_max(values.iter().copied()) else {
        return data.clone();
    };
    // Never widen a column that already fits its current storage.
    let target = narrowest_int_width(min, max).min(current);
    if target == current {
        return data.clone();
    }
    // The range check above guarantees the casts are exact.
    match target {
        IntWidth::I8 => ColumnData::Int8(values.iter().map(|&v| v as i8).collect()),
        IntWidth::I16 => ColumnData::Int16(values.iter().map(|&v| v as i16).collect()),
        IntWidth::I32 => ColumnData::Int32(values.iter().map(|&v| v as i32).collect()),
        IntWidth::I64 => ColumnData::Int64(values),
    }
}

fn narrow_floats(data: &ColumnData) -> ColumnData {
    let Some(current) = FloatWidth::of(data) else {
        return data.clone();
    };
    let values = data.to_f64_lossy();
    let Some((min, max)) = min_max(values.iter().copied().filter(|v| !v.is_nan())) else {
        return data.clone();
    };
    let target = narrowest_float_width(min, max).min(current);
    if target == current {
        return data.clone();
    }
    match target {
        FloatWidth::F16 => ColumnData::Float16(values.iter().map(|&v| f16::from_f64(v)).collect()),
        FloatWidth::F32 => ColumnData::Float32(values.iter().map(|&v| v as f32).collect()),
        FloatWidth::F64 => ColumnData::Float64(values),
    }
}

fn to_categorical(data: &ColumnData) -> ColumnData {
    match data {
        ColumnData::Categorical(_) => data.clone(),
        ColumnData::Text(values) => {
            ColumnData::Categorical(Categorical::from_values(values.iter().map(Option::as_deref)))
        }
        ColumnData::Bool(values) => {
            ColumnData::Categorical(Categorical::from_bools(values.iter().map(|&v| Some(v))))
        }
        other => {
            let text = other.to_text();
            ColumnData::Categorical(Categorical::from_values(text.iter().map(Option::as_deref)))
        }
    }
}

fn min_max<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((
            if v < lo { v } else { lo },
            if v > hi { v } else { hi },
        )),
    })
}
