use std::collections::{BTreeSet, HashMap};

/// Per-row dictionary codes, `-1` marks a missing value.
///
/// The code width follows the dictionary size: fewer than 127 categories use
/// 8-bit codes, fewer than 32767 use 16-bit codes, anything larger uses 32-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codes {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl Codes {
    fn with_capacity(categories: usize, rows: usize) -> Self {
        if categories < i8::MAX as usize {
            Codes::I8(Vec::with_capacity(rows))
        } else if categories < i16::MAX as usize {
            Codes::I16(Vec::with_capacity(rows))
        } else {
            Codes::I32(Vec::with_capacity(rows))
        }
    }

    fn push(&mut self, code: i32) {
        // Width was chosen from the dictionary size, so the cast cannot truncate.
        match self {
            Codes::I8(codes) => codes.push(code as i8),
            Codes::I16(codes) => codes.push(code as i16),
            Codes::I32(codes) => codes.push(code),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Codes::I8(codes) => codes.len(),
            Codes::I16(codes) => codes.len(),
            Codes::I32(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw code for a row, `-1` when missing.
    pub fn get(&self, row: usize) -> i32 {
        match self {
            Codes::I8(codes) => codes[row] as i32,
            Codes::I16(codes) => codes[row] as i32,
            Codes::I32(codes) => codes[row],
        }
    }

    /// Bytes used by a single code.
    pub fn width_bytes(&self) -> usize {
        match self {
            Codes::I8(_) => 1,
            Codes::I16(_) => 2,
            Codes::I32(_) => 4,
        }
    }
}

/// Distinct values a categorical column can decode to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dictionary {
    /// Sorted distinct strings.
    Text(Vec<String>),
    /// Observed booleans, `false` before `true`, held inline.
    Bool { values: [bool; 2], len: u8 },
}

impl Dictionary {
    /// Number of categories.
    pub fn len(&self) -> usize {
        match self {
            Dictionary::Text(values) => values.len(),
            Dictionary::Bool { len, .. } => *len as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn label(&self, code: usize) -> Option<&str> {
        match self {
            Dictionary::Text(values) => values.get(code).map(String::as_str),
            Dictionary::Bool { values, len } => values[..*len as usize]
                .get(code)
                .map(|&value| bool_label(value)),
        }
    }

    fn heap_bytes(&self) -> usize {
        match self {
            Dictionary::Text(values) => values
                .iter()
                .map(|value| std::mem::size_of::<String>() + value.len())
                .sum(),
            Dictionary::Bool { .. } => 0,
        }
    }
}

fn bool_label(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Dictionary-encoded column.
///
/// Distinct values are stored once, sorted, and each row stores an index into
/// that dictionary. Text and boolean origins keep their own dictionary type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorical {
    dictionary: Dictionary,
    codes: Codes,
}

impl Categorical {
    /// Encode a sequence of optional strings.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();
        let distinct: BTreeSet<&str> = values.clone().flatten().collect();
        let index: HashMap<&str, i32> = distinct
            .iter()
            .enumerate()
            .map(|(idx, value)| (*value, idx as i32))
            .collect();
        let rows = values.size_hint().0;
        let mut codes = Codes::with_capacity(distinct.len(), rows);
        for value in values {
            let code = value.and_then(|v| index.get(v).copied()).unwrap_or(-1);
            codes.push(code);
        }
        Self {
            dictionary: Dictionary::Text(distinct.into_iter().map(str::to_string).collect()),
            codes,
        }
    }

    /// Encode a sequence of optional booleans.
    pub fn from_bools<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<bool>>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();
        let has_false = values.clone().any(|value| value == Some(false));
        let has_true = values.clone().any(|value| value == Some(true));
        let dictionary = match (has_false, has_true) {
            (true, true) => Dictionary::Bool { values: [false, true], len: 2 },
            (true, false) => Dictionary::Bool { values: [false, false], len: 1 },
            (false, true) => Dictionary::Bool { values: [true, true], len: 1 },
            (false, false) => Dictionary::Bool { values: [false, false], len: 0 },
        };
        let mut codes = Codes::with_capacity(dictionary.len(), values.size_hint().0);
        for value in values {
            let code = match value {
                None => -1,
                Some(true) if has_false => 1,
                Some(_) => 0,
            };
            codes.push(code);
        }
        Self { dictionary, codes }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Sorted distinct values as text.
    pub fn categories(&self) -> Vec<&str> {
        (0..self.dictionary.len())
            .filter_map(|code| self.dictionary.label(code))
            .collect()
    }

    pub fn codes(&self) -> &Codes {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Decoded value for a row.
    pub fn get(&self, row: usize) -> Option<&str> {
        let code = self.codes.get(row);
        if code < 0 {
            return None;
        }
        self.dictionary.label(code as usize)
    }

    /// Boolean value for a row of a boolean-origin column.
    pub fn get_bool(&self, row: usize) -> Option<bool> {
        match &self.dictionary {
            Dictionary::Bool { values, len } => {
                let code = self.codes.get(row);
                if code < 0 {
                    return None;
                }
                values[..*len as usize].get(code as usize).copied()
            }
            Dictionary::Text(_) => None,
        }
    }

    /// Iterate decoded values in row order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + Clone + '_ {
        (0..self.len()).map(|row| self.get(row))
    }

    /// Decode every row back into owned strings.
    pub fn decode(&self) -> Vec<Option<String>> {
        self.iter().map(|value| value.map(str::to_string)).collect()
    }

    /// Rows picked by index, re-encoded against the surviving values.
    pub fn take(&self, indices: &[usize]) -> Self {
        match self.dictionary {
            Dictionary::Bool { .. } => {
                Self::from_bools(indices.iter().map(|&row| self.get_bool(row)))
            }
            Dictionary::Text(_) => Self::from_values(indices.iter().map(|&row| self.get(row))),
        }
    }

    /// Rows of `self` followed by rows of `other`, re-encoded once.
    ///
    /// Two boolean-origin columns stay boolean; any other pairing decodes to text.
    pub fn concat(&self, other: &Categorical) -> Self {
        match (&self.dictionary, &other.dictionary) {
            (Dictionary::Bool { .. }, Dictionary::Bool { .. }) => Self::from_bools(
                (0..self.len())
                    .map(|row| self.get_bool(row))
                    .chain((0..other.len()).map(|row| other.get_bool(row))),
            ),
            _ => Self::from_values(self.iter().chain(other.iter())),
        }
    }

    /// Footprint in bytes: the code vector plus each heap-held dictionary entry.
    pub fn memory_usage(&self) -> usize {
        self.codes.len() * self.codes.width_bytes() + self.dictionary.heap_bytes()
    }
}
