//! CSV ingestion with per-column type inference, and CSV output.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Column, ColumnData, Table, TableError};

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file has no header line.
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    /// Unclosed quote or stray characters after a closing quote.
    #[error("{path}:{line}: malformed CSV record")]
    Malformed { path: PathBuf, line: usize },
    #[error("{path}:{line}: expected {expected} fields, found {found}")]
    RaggedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Delimiter and quote characters.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quote: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }
}

/// Read a CSV file with default options.
pub fn read_csv(path: &Path) -> Result<Table, CsvError> {
    read_csv_with(path, &CsvOptions::default())
}

/// Read a CSV file, inferring each column's storage from its values.
///
/// Integers become `Int64` unless a field is empty, numbers with gaps or
/// fractions become `Float64` (gaps read as NaN), `True`/`False` columns become
/// `Bool`, and everything else is `Text` with empty fields missing.
///
/// Records may span lines inside quoted fields. Storage is decided in a first
/// pass over the records and filled in a second, so cells are never held as
/// owned strings unless they end up in a text column.
pub fn read_csv_with(path: &Path, opts: &CsvOptions) -> Result<Table, CsvError> {
    let text = std::fs::read_to_string(path).map_err(|source| CsvError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |line: usize| CsvError::Malformed {
        path: path.to_path_buf(),
        line,
    };

    let mut records = Records::new(&text, opts);
    let header: Vec<String> = match records.next() {
        Some(Ok(record)) => record.fields.into_iter().map(Cow::into_owned).collect(),
        Some(Err(line)) => return Err(malformed(line)),
        None => {
            return Err(CsvError::Empty {
                path: path.to_path_buf(),
            });
        }
    };

    let mut inference = vec![Inference::default(); header.len()];
    for record in records.clone() {
        let record = record.map_err(malformed)?;
        if record.fields.len() != header.len() {
            return Err(CsvError::RaggedRow {
                path: path.to_path_buf(),
                line: record.line,
                expected: header.len(),
                found: record.fields.len(),
            });
        }
        for (state, field) in inference.iter_mut().zip(&record.fields) {
            state.observe(field);
        }
    }

    let mut builders: Vec<ColumnBuilder> = inference.iter().map(ColumnBuilder::new).collect();
    for record in records {
        let record = record.map_err(malformed)?;
        for (builder, field) in builders.iter_mut().zip(record.fields) {
            builder.push(field);
        }
    }

    let columns = header
        .into_iter()
        .zip(builders)
        .map(|(name, builder)| Column::new(name, builder.finish()))
        .collect();
    Ok(Table::new(columns)?)
}

/// Column names from the header record only.
pub fn read_csv_header(path: &Path) -> Result<Vec<String>, CsvError> {
    let text = std::fs::read_to_string(path).map_err(|source| CsvError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let opts = CsvOptions::default();
    match Records::new(&text, &opts).next() {
        Some(Ok(record)) => Ok(record.fields.into_iter().map(Cow::into_owned).collect()),
        Some(Err(line)) => Err(CsvError::Malformed {
            path: path.to_path_buf(),
            line,
        }),
        None => Err(CsvError::Empty {
            path: path.to_path_buf(),
        }),
    }
}

/// Write a header record plus one record per row. Missing cells are empty fields.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), CsvError> {
    let opts = CsvOptions::default();
    let map_err = |source: std::io::Error| CsvError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(map_err)?;
    }
    let file = File::create(path).map_err(map_err)?;
    let mut out = BufWriter::new(file);
    let delimiter = opts.delimiter.to_string();

    let header: Vec<String> = table
        .column_names()
        .into_iter()
        .map(|name| quote_field(name, &opts))
        .collect();
    writeln!(out, "{}", header.join(&delimiter)).map_err(map_err)?;

    let mut fields = Vec::with_capacity(table.num_columns());
    for row in 0..table.num_rows() {
        fields.clear();
        for column in table.columns() {
            fields.push(quote_field(&column.value(row).to_string(), &opts));
        }
        writeln!(out, "{}", fields.join(&delimiter)).map_err(map_err)?;
    }
    out.flush().map_err(map_err)
}

/// Running view of which storage a column's fields still fit.
#[derive(Debug, Clone, Copy)]
struct Inference {
    rows: usize,
    empty: usize,
    ints: bool,
    floats: bool,
    bools: bool,
}

impl Default for Inference {
    fn default() -> Self {
        Self {
            rows: 0,
            empty: 0,
            ints: true,
            floats: true,
            bools: true,
        }
    }
}

impl Inference {
    fn observe(&mut self, field: &str) {
        self.rows += 1;
        if field.is_empty() {
            self.empty += 1;
            return;
        }
        let value = field.trim();
        self.ints = self.ints && value.parse::<i64>().is_ok();
        self.floats = self.floats && value.parse::<f64>().is_ok();
        self.bools = self.bools && parse_bool(value).is_some();
    }
}

/// Typed storage filled during the second pass.
enum ColumnBuilder {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
    Text(Vec<Option<String>>),
}

impl ColumnBuilder {
    fn new(inference: &Inference) -> Self {
        let rows = inference.rows;
        let gaps = inference.empty > 0;
        if rows == 0 {
            ColumnBuilder::Text(Vec::new())
        } else if inference.empty == rows {
            ColumnBuilder::Float(Vec::with_capacity(rows))
        } else if !gaps && inference.ints {
            ColumnBuilder::Int(Vec::with_capacity(rows))
        } else if inference.floats {
            ColumnBuilder::Float(Vec::with_capacity(rows))
        } else if !gaps && inference.bools {
            ColumnBuilder::Bool(Vec::with_capacity(rows))
        } else {
            ColumnBuilder::Text(Vec::with_capacity(rows))
        }
    }

    /// Append one field. The first pass already proved it parses.
    fn push(&mut self, field: Cow<'_, str>) {
        match self {
            ColumnBuilder::Int(values) => values.push(field.trim().parse().unwrap_or_default()),
            ColumnBuilder::Float(values) => values.push(if field.is_empty() {
                f64::NAN
            } else {
                field.trim().parse().unwrap_or(f64::NAN)
            }),
            ColumnBuilder::Bool(values) => values.push(parse_bool(&field).unwrap_or_default()),
            ColumnBuilder::Text(values) => {
                values.push((!field.is_empty()).then(|| field.into_owned()))
            }
        }
    }

    fn finish(self) -> ColumnData {
        match self {
            ColumnBuilder::Int(values) => ColumnData::Int64(values),
            ColumnBuilder::Float(values) => ColumnData::Float64(values),
            ColumnBuilder::Bool(values) => ColumnData::Bool(values),
            ColumnBuilder::Text(values) => ColumnData::Text(values),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Quote a field if it contains the delimiter, the quote char, or a line break.
pub fn quote_field(value: &str, opts: &CsvOptions) -> String {
    let q = opts.quote;
    let needs_quoting = value.contains(opts.delimiter)
        || value.contains(q)
        || value.contains('\n')
        || value.contains('\r');
    if needs_quoting {
        let escaped = value.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    } else {
        value.to_string()
    }
}

/// One parsed record and the line it starts on.
#[derive(Debug)]
struct Record<'a> {
    line: usize,
    fields: Vec<Cow<'a, str>>,
}

/// Iterator over the records of CSV text. Blank lines are skipped; a record
/// that cannot be parsed yields its starting line number and ends iteration.
#[derive(Clone)]
struct Records<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    opts: &'a CsvOptions,
}

impl<'a> Records<'a> {
    fn new(text: &'a str, opts: &'a CsvOptions) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            opts,
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, usize>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.text[self.pos..];
            if rest.is_empty() {
                return None;
            }
            let blank = if rest.starts_with("\r\n") {
                2
            } else if rest.starts_with('\n') {
                1
            } else {
                break;
            };
            self.pos += blank;
            self.line += 1;
        }
        let line = self.line;
        match parse_record(&self.text[self.pos..], self.opts) {
            Some((fields, consumed, newlines)) => {
                self.pos += consumed;
                self.line += newlines;
                Some(Ok(Record { line, fields }))
            }
            None => {
                self.pos = self.text.len();
                Some(Err(line))
            }
        }
    }
}

/// Parse the record at the start of `input`.
///
/// Returns the fields, the bytes consumed including the record terminator,
/// and the number of line breaks consumed. Quoted fields may contain the
/// delimiter, line breaks, and doubled quotes. `None` marks an unclosed quote
/// or stray characters after a closing quote.
pub fn parse_record<'a>(
    input: &'a str,
    opts: &CsvOptions,
) -> Option<(Vec<Cow<'a, str>>, usize, usize)> {
    let (q, d) = (opts.quote, opts.delimiter);
    let mut fields = Vec::new();
    let mut newlines = 0usize;
    let mut chars = input.char_indices().peekable();

    loop {
        let field_start = chars.peek().map_or(input.len(), |&(idx, _)| idx);
        if chars.peek().map(|&(_, c)| c) == Some(q) {
            chars.next();
            let content_start = field_start + q.len_utf8();
            let mut segment_start = content_start;
            let mut unescaped: Option<String> = None;
            let mut closed_at = None;
            while let Some((idx, c)) = chars.next() {
                if c == q {
                    if chars.peek().map(|&(_, c)| c) == Some(q) {
                        chars.next();
                        let buf = unescaped.get_or_insert_with(String::new);
                        buf.push_str(&input[segment_start..idx + q.len_utf8()]);
                        segment_start = idx + 2 * q.len_utf8();
                    } else {
                        closed_at = Some(idx);
                        break;
                    }
                } else if c == '\n' {
                    newlines += 1;
                }
            }
            let end = closed_at?;
            fields.push(match unescaped {
                Some(mut buf) => {
                    buf.push_str(&input[segment_start..end]);
                    Cow::Owned(buf)
                }
                None => Cow::Borrowed(&input[content_start..end]),
            });
            match chars.next() {
                Some((_, c)) if c == d => {}
                Some((idx, '\n')) => return Some((fields, idx + 1, newlines + 1)),
                Some((_, '\r')) => match chars.next() {
                    Some((idx, '\n')) => return Some((fields, idx + 1, newlines + 1)),
                    None => return Some((fields, input.len(), newlines)),
                    _ => return None,
                },
                None => return Some((fields, input.len(), newlines)),
                Some(_) => return None,
            }
        } else {
            loop {
                match chars.next() {
                    Some((idx, c)) if c == d => {
                        fields.push(Cow::Borrowed(&input[field_start..idx]));
                        break;
                    }
                    Some((idx, '\n')) => {
                        let field = input[field_start..idx].trim_end_matches('\r');
                        fields.push(Cow::Borrowed(field));
                        return Some((fields, idx + 1, newlines + 1));
                    }
                    Some(_) => {}
                    None => {
                        let field = input[field_start..].trim_end_matches('\r');
                        fields.push(Cow::Borrowed(field));
                        return Some((fields, input.len(), newlines));
                    }
                }
            }
        }
    }
}
