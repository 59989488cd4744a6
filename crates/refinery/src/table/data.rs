//! In-memory table storage.

use std::collections::HashSet;

use crate::error::{RefineryError, Result};

use super::types::ColumnType;
use super::value::Value;

/// Row labels of a table.
///
/// A fresh table carries the ordinal index: labels `0..n` assigned at
/// construction and kept through filtering. Promoting a column replaces the
/// labels with that column's values and records its name.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    name: Option<String>,
    labels: Vec<Value>,
}

impl Index {
    /// Ordinal labels `0..len`.
    pub fn ordinal(len: usize) -> Self {
        Self {
            name: None,
            labels: (0..len as i64).map(Value::Int).collect(),
        }
    }

    /// Labels taken from a named column.
    pub fn named(name: impl Into<String>, labels: Vec<Value>) -> Self {
        Self {
            name: Some(name.into()),
            labels,
        }
    }

    /// Name of the promoted column, `None` for the ordinal index.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn labels(&self) -> &[Value] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// True when every label is a date, a date-time or a null, and at least
    /// one label is not null. Vacuously true for an empty index.
    pub fn is_temporal(&self) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        self.labels
            .iter()
            .all(|l| matches!(l, Value::Null | Value::Date(_) | Value::DateTime(_)))
            && self.labels.iter().any(|l| !l.is_null())
    }

    fn select(&self, positions: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            labels: positions
                .iter()
                .filter_map(|&p| self.labels.get(p).cloned())
                .collect(),
        }
    }
}

/// A rectangular table of typed cells (row-major order).
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: Index,
}

impl DataTable {
    /// Create a table from headers and rows.
    ///
    /// Headers must be unique and every row must have one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(RefineryError::InvalidArgument(format!(
                    "duplicate column name '{}'",
                    h
                )));
            }
        }

        let width = headers.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(RefineryError::InvalidArgument(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                width
            )));
        }

        let index = Index::ordinal(rows.len());
        Ok(Self {
            headers,
            rows,
            index,
        })
    }

    /// Create a table from named columns of equal length.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut headers = Vec::with_capacity(columns.len());
        let mut rows: Vec<Vec<Value>> = (0..height)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();

        for (name, values) in columns {
            let name = name.into();
            if values.len() != height {
                return Err(RefineryError::InvalidArgument(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    height
                )));
            }
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
            headers.push(name);
        }

        Self::new(headers, rows)
    }

    /// A table with the same columns and index name but no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: Vec::new(),
            index: Index {
                name: self.index.name.clone(),
                labels: Vec::new(),
            },
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column by name, or `UnknownColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| RefineryError::UnknownColumn(name.to_string()))
    }

    /// Get all values for a column by position.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Overwrite a cell. Returns false when the position is out of range.
    pub fn set(&mut self, row: usize, col: usize, value: Value) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    /// Non-null numeric cells of a column as `(row position, value)`.
    pub fn numeric_values(&self, col: usize) -> Vec<(usize, f64)> {
        self.column_values(col)
            .enumerate()
            .filter_map(|(i, v)| v.as_f64().map(|x| (i, x)))
            .collect()
    }

    /// Scan a column and report its type.
    ///
    /// Integers mixed with floats give `Float`, dates mixed with date-times
    /// give `DateTime`, any other mix gives `String`. A column with no
    /// non-null value is `Unknown`.
    pub fn column_type(&self, col: usize) -> ColumnType {
        let mut inferred: Option<ColumnType> = None;
        for value in self.column_values(col) {
            let Some(t) = value.value_type() else {
                continue;
            };
            inferred = Some(match (inferred, t) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                (Some(ColumnType::Date), ColumnType::DateTime)
                | (Some(ColumnType::DateTime), ColumnType::Date) => ColumnType::DateTime,
                _ => return ColumnType::String,
            });
        }
        inferred.unwrap_or(ColumnType::Unknown)
    }

    /// Copy the rows at the given positions, in the given order, keeping
    /// their index labels.
    pub fn select_rows(&self, positions: &[usize]) -> DataTable {
        DataTable {
            headers: self.headers.clone(),
            rows: positions
                .iter()
                .filter_map(|&p| self.rows.get(p).cloned())
                .collect(),
            index: self.index.select(positions),
        }
    }

    /// Keep only the rows whose mask entry is true. Returns how many rows
    /// were removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.rows.len();
        let mut mask = keep.iter();
        self.rows.retain(|_| mask.next().copied().unwrap_or(true));
        let mut mask = keep.iter();
        self.index
            .labels
            .retain(|_| mask.next().copied().unwrap_or(true));
        before - self.rows.len()
    }

    /// Remove the rows at the given positions. Returns how many rows were
    /// removed.
    pub fn remove_rows(&mut self, positions: &[usize]) -> usize {
        let mut keep = vec![true; self.rows.len()];
        for &p in positions {
            if let Some(k) = keep.get_mut(p) {
                *k = false;
            }
        }
        self.retain_rows(&keep)
    }

    /// Remove a column and return its values.
    pub fn take_column(&mut self, col: usize) -> Option<(String, Vec<Value>)> {
        if col >= self.headers.len() {
            return None;
        }
        let name = self.headers.remove(col);
        let values = self.rows.iter_mut().map(|r| r.remove(col)).collect();
        Some((name, values))
    }

    /// Replace the values of an existing column, or append a new one.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(RefineryError::InvalidArgument(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Apply a function to every cell of a column. Returns how many cells
    /// changed.
    pub fn map_column<F>(&mut self, col: usize, mut f: F) -> usize
    where
        F: FnMut(&Value) -> Value,
    {
        let mut changed = 0;
        for row in &mut self.rows {
            let next = f(&row[col]);
            if next != row[col] {
                row[col] = next;
                changed += 1;
            }
        }
        changed
    }

    /// Replace the index.
    pub fn set_index(&mut self, index: Index) -> Result<()> {
        if index.len() != self.rows.len() {
            return Err(RefineryError::InvalidArgument(format!(
                "index has {} labels, table has {} rows",
                index.len(),
                self.rows.len()
            )));
        }
        self.index = index;
        Ok(())
    }
}
