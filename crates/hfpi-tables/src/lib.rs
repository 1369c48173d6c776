//! Numeric CSV tables for HFPI inputs.
//!
//! Every input of the solver (modes, floors, modal shapes, force histories)
//! is a header row followed by numeric rows. Tables are stored column-major
//! so that callers can pull whole time series out without copying row by row.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{table}: missing required columns: {}", .missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },

    #[error("{table}: no column named {column}")]
    UnknownColumn { table: String, column: String },

    #[error("{table}: column {column:?} is not a floor index")]
    NotAnIndex { table: String, column: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl Table {
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TableError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse_reader(name, file)
    }

    pub fn parse_str(name: impl Into<String>, raw: &str) -> Result<Self> {
        Self::parse_reader(name, raw.as_bytes())
    }

    fn parse_reader(name: impl Into<String>, reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut columns = vec![Vec::new(); headers.len()];

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = record.position().map_or(row + 2, |p| p.line() as usize);
            if record.len() != headers.len() {
                return Err(TableError::Parse {
                    line,
                    message: format!(
                        "expected {} fields, found {}",
                        headers.len(),
                        record.len()
                    ),
                });
            }
            for (idx, field) in record.iter().enumerate() {
                let value = field.parse::<f64>().map_err(|_| TableError::Parse {
                    line,
                    message: format!("column {}: '{field}' is not a number", headers[idx]),
                })?;
                columns[idx].push(value);
            }
        }

        Ok(Self {
            name: name.into(),
            headers,
            columns,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fails with every missing column listed, not only the first one.
    pub fn require(&self, columns: &[&str]) -> Result<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TableError::MissingColumns {
                table: self.name.clone(),
                missing,
            })
        }
    }

    pub fn column(&self, column: &str) -> Result<&[f64]> {
        self.headers
            .iter()
            .position(|h| h == column)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| TableError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Columns whose header is a non-negative integer, in header order.
    ///
    /// Every column must be either listed in `keep` or carry an index; any
    /// other header is an error rather than being left out.
    pub fn indexed_columns(&self, keep: &[&str]) -> Result<Vec<(usize, &[f64])>> {
        let mut indexed = Vec::with_capacity(self.headers.len());
        for (header, column) in self.headers.iter().zip(&self.columns) {
            if keep.contains(&header.as_str()) {
                continue;
            }
            let idx = header
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| header.parse::<usize>().ok())
                .flatten()
                .ok_or_else(|| TableError::NotAnIndex {
                    table: self.name.clone(),
                    column: header.clone(),
                })?;
            indexed.push((idx, column.as_slice()));
        }
        Ok(indexed)
    }
}
