//! Tabular dataset model: rectangular rows, column mapping, and the
//! exportable result table.
//!
//! A [`Dataset`] is an ordered sequence of rows with named columns. Rows are
//! addressed by their 0-based position, which is also their identity for
//! resumption. The column set is identical across all rows; this is enforced
//! when the dataset is built or parsed.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column header used for the generated text in checkpoints and exports.
pub const RESPONSE_COLUMN: &str = "Response";

/// A rectangular, in-memory table with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset from column headers and row values.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when any row's width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::InvalidConfig(format!(
                    "row {} has {} values but the dataset has {} columns",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Parse a headered CSV document.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let columns: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { columns, rows })
    }

    /// Parse a headered CSV file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow the row at `index`, if it exists.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
            index,
        })
    }

    /// Iterate all rows in positional order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(|(index, values)| Row {
            columns: &self.columns,
            values,
            index,
        })
    }
}

/// A borrowed view of one dataset row, addressed by its 0-based index.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [String],
    index: usize,
}

impl<'a> Row<'a> {
    /// 0-based position of this row in the dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The value under the named column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    /// All values in dataset column order.
    pub fn values(&self) -> &'a [String] {
        self.values
    }
}

/// Mapping from dataset column names to prompt template variable names.
///
/// Used to build the per-row variable substitution context. Mappings are
/// expected 1:1; a column mapped under two variable names is allowed, the
/// last insertion winning for duplicate variable names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `column`'s value to the templates under `{variable}`.
    pub fn map(mut self, column: impl Into<String>, variable: impl Into<String>) -> Self {
        self.pairs.push((column.into(), variable.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Check that every mapped column exists in the dataset.
    ///
    /// Run this before processing starts; a dangling column is a
    /// configuration defect that would otherwise surface on the first row.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        for (column, _) in &self.pairs {
            if !dataset.columns().iter().any(|c| c == column) {
                return Err(Error::InvalidConfig(format!(
                    "mapped column '{}' does not exist in the dataset",
                    column
                )));
            }
        }
        Ok(())
    }

    /// Build the variable substitution context for one row.
    pub fn context_for(&self, row: &Row<'_>) -> Result<HashMap<String, String>> {
        let mut variables = HashMap::with_capacity(self.pairs.len());
        for (column, variable) in &self.pairs {
            let value = row.get(column).ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "mapped column '{}' does not exist in the dataset",
                    column
                ))
            })?;
            variables.insert(variable.clone(), value.to_string());
        }
        Ok(variables)
    }
}

/// The final exportable table: the original dataset columns plus
/// [`RESPONSE_COLUMN`], rows in ascending dataset-index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The generated text of the row at `index` (positional, not dataset index).
    pub fn response(&self, index: usize) -> Option<&str> {
        self.rows.get(index).and_then(|row| row.last()).map(String::as_str)
    }

    /// Write the table as headered CSV.
    pub fn to_writer(&self, writer: impl Write) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Render the table as a CSV string, ready for download or display.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Other(e.to_string()))
    }
}
