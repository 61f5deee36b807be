use std::fmt;

use half::f16;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::categorical::Categorical;

/// Conceptual kind of a column, derived from its storage variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Float,
    /// Text or dictionary-encoded text.
    Categorical,
    Timestamp,
    /// Anything else (currently booleans).
    Other,
}

/// Typed storage for a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
    /// Nanoseconds since the Unix epoch.
    Timestamp(Vec<i64>),
    Text(Vec<Option<String>>),
    Categorical(Categorical),
}

/// Borrowed view of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(i64),
    Text(&'a str),
}

impl Value<'_> {
    /// Numeric view of the cell; booleans map to 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            Value::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Bool(v) => Some(v as i64),
            Value::Float(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Timestamp(nanos) => {
                match OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
                    .ok()
                    .and_then(|ts| ts.format(&Rfc3339).ok())
                {
                    Some(text) => f.write_str(&text),
                    None => write!(f, "{nanos}"),
                }
            }
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float16(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify the storage variant.
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Int8(_)
            | ColumnData::Int16(_)
            | ColumnData::Int32(_)
            | ColumnData::Int64(_) => ColumnKind::Integer,
            ColumnData::Float16(_) | ColumnData::Float32(_) | ColumnData::Float64(_) => {
                ColumnKind::Float
            }
            ColumnData::Text(_) | ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Timestamp(_) => ColumnKind::Timestamp,
            ColumnData::Bool(_) => ColumnKind::Other,
        }
    }

    /// Storage name in the familiar dataframe vocabulary.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            ColumnData::Int8(_) => "int8",
            ColumnData::Int16(_) => "int16",
            ColumnData::Int32(_) => "int32",
            ColumnData::Int64(_) => "int64",
            ColumnData::Float16(_) => "float16",
            ColumnData::Float32(_) => "float32",
            ColumnData::Float64(_) => "float64",
            ColumnData::Bool(_) => "bool",
            ColumnData::Timestamp(_) => "datetime64[ns]",
            ColumnData::Text(_) => "object",
            ColumnData::Categorical(_) => "category",
        }
    }

    /// Cell at `row`. NaN floats read as `Value::Null`.
    pub fn value(&self, row: usize) -> Value<'_> {
        match self {
            ColumnData::Int8(v) => Value::Int(v[row] as i64),
            ColumnData::Int16(v) => Value::Int(v[row] as i64),
            ColumnData::Int32(v) => Value::Int(v[row] as i64),
            ColumnData::Int64(v) => Value::Int(v[row]),
            ColumnData::Float16(v) => float_value(v[row].to_f64()),
            ColumnData::Float32(v) => float_value(v[row] as f64),
            ColumnData::Float64(v) => float_value(v[row]),
            ColumnData::Bool(v) => Value::Bool(v[row]),
            ColumnData::Timestamp(v) => Value::Timestamp(v[row]),
            ColumnData::Text(v) => v[row].as_deref().map_or(Value::Null, Value::Text),
            ColumnData::Categorical(v) => v.get(row).map_or(Value::Null, Value::Text),
        }
    }

    /// Iterate cells in row order.
    pub fn values(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.len()).map(|row| self.value(row))
    }

    /// Bytes used by this column's in-memory representation.
    pub fn memory_usage(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len() * 2,
            ColumnData::Int32(v) => v.len() * 4,
            ColumnData::Int64(v) => v.len() * 8,
            ColumnData::Float16(v) => v.len() * 2,
            ColumnData::Float32(v) => v.len() * 4,
            ColumnData::Float64(v) => v.len() * 8,
            ColumnData::Bool(v) => v.len(),
            ColumnData::Timestamp(v) => v.len() * 8,
            ColumnData::Text(v) => {
                let heap: usize = v.iter().flatten().map(String::len).sum();
                v.len() * std::mem::size_of::<Option<String>>() + heap
            }
            ColumnData::Categorical(v) => v.memory_usage(),
        }
    }

    /// Rows picked by index, in the order given.
    pub fn take(&self, indices: &[usize]) -> ColumnData {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&row| values[row].clone()).collect()
        }
        match self {
            ColumnData::Int8(v) => ColumnData::Int8(pick(v, indices)),
            ColumnData::Int16(v) => ColumnData::Int16(pick(v, indices)),
            ColumnData::Int32(v) => ColumnData::Int32(pick(v, indices)),
            ColumnData::Int64(v) => ColumnData::Int64(pick(v, indices)),
            ColumnData::Float16(v) => ColumnData::Float16(pick(v, indices)),
            ColumnData::Float32(v) => ColumnData::Float32(pick(v, indices)),
            ColumnData::Float64(v) => ColumnData::Float64(pick(v, indices)),
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, indices)),
            ColumnData::Timestamp(v) => ColumnData::Timestamp(pick(v, indices)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, indices)),
            ColumnData::Categorical(v) => ColumnData::Categorical(v.take(indices)),
        }
    }

    /// Append `other` when both share a storage variant.
    ///
    /// Returns `false` and leaves `self` untouched on a variant mismatch.
    pub fn try_append(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend_from_slice(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend_from_slice(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend_from_slice(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend_from_slice(b),
            (ColumnData::Float16(a), ColumnData::Float16(b)) => a.extend_from_slice(b),
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend_from_slice(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend_from_slice(b),
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend_from_slice(b),
            (ColumnData::Timestamp(a), ColumnData::Timestamp(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend_from_slice(b),
            (ColumnData::Categorical(a), ColumnData::Categorical(b)) => {
                *a = a.concat(b);
            }
            _ => return false,
        }
        true
    }

    /// Every cell widened to `f64`, missing cells as NaN.
    pub fn to_f64_lossy(&self) -> Vec<f64> {
        self.values()
            .map(|value| value.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Every cell rendered as text, missing cells as `None`.
    pub fn to_text(&self) -> Vec<Option<String>> {
        self.values()
            .map(|value| (!value.is_null()).then(|| value.to_string()))
            .collect()
    }
}

fn float_value(v: f64) -> Value<'static> {
    if v.is_nan() {
        Value::Null
    } else {
        Value::Float(v)
    }
}

/// Named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Text column repeating `value` for every row.
    pub fn constant_text(name: impl Into<String>, value: &str, rows: usize) -> Self {
        Self::new(name, ColumnData::Text(vec![Some(value.to_string()); rows]))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn value(&self, row: usize) -> Value<'_> {
        self.data.value(row)
    }

    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: self.data,
        }
    }
}
