//! Missing-value reporting and imputation.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::TransformChange;
use crate::error::{RefineryError, Result};
use crate::stats;
use crate::table::{ColumnKind, ColumnType, DataTable, Value};

use super::TableProcessor;

/// How missing values are repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Remove every row that has a null.
    Drop,
    /// Numeric columns get their mean, other columns their mode.
    Mean,
    /// Numeric columns get their median, other columns their mode.
    Median,
    /// Every column gets its mode.
    MostFrequent,
}

impl FromStr for ImputeStrategy {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(ImputeStrategy::Drop),
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            "most_frequent" | "mode" => Ok(ImputeStrategy::MostFrequent),
            _ => Err(RefineryError::UnsupportedStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImputeStrategy::Drop => "drop",
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
        };
        f.write_str(name)
    }
}

/// Null counts per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingReport {
    /// Every column with its null count, in column order.
    pub per_column: IndexMap<String, usize>,
    /// Sum over all columns.
    pub total: usize,
}

impl MissingReport {
    /// Only the columns that have at least one null.
    pub fn columns_with_missing(&self) -> IndexMap<String, usize> {
        self.per_column
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(k, n)| (k.clone(), *n))
            .collect()
    }
}

/// Outcome of [`TableProcessor::handle_missing_with_report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    pub strategy: ImputeStrategy,
    /// Number of cells filled per column.
    pub filled: IndexMap<String, usize>,
    /// Columns with no non-null value to derive a fill from.
    pub unfillable: Vec<String>,
    /// Rows removed by the `drop` strategy.
    pub rows_dropped: usize,
    /// Columns rounded and cast to integers afterwards.
    pub converted_to_int: Vec<String>,
    /// Nulls left in the table afterwards.
    pub remaining_missing: usize,
}

impl TableProcessor {
    /// Count nulls per column.
    pub fn missing_report(&self) -> MissingReport {
        let per_column: IndexMap<String, usize> = self
            .table
            .headers()
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let nulls = self.table.column_values(c).filter(|v| v.is_null()).count();
                (name.clone(), nulls)
            })
            .collect();
        let total = per_column.values().sum();

        if total == 0 {
            info!("no missing values found");
        } else {
            info!(total, "missing values found");
        }

        MissingReport { per_column, total }
    }

    /// Rows with at least one null.
    pub fn missing_rows(&self) -> DataTable {
        let positions: Vec<usize> = self
            .table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(Value::is_null))
            .map(|(i, _)| i)
            .collect();
        self.table.select_rows(&positions)
    }

    /// Repair nulls, then round and cast `force_int_columns` to integers.
    pub fn handle_missing(
        &mut self,
        strategy: ImputeStrategy,
        force_int_columns: &[&str],
    ) -> Result<&mut Self> {
        self.handle_missing_with_report(strategy, force_int_columns)?;
        Ok(self)
    }

    /// [`handle_missing`](Self::handle_missing), returning what was done.
    pub fn handle_missing_with_report(
        &mut self,
        strategy: ImputeStrategy,
        force_int_columns: &[&str],
    ) -> Result<ImputationReport> {
        let int_columns = force_int_columns
            .iter()
            .map(|&name| self.numeric_column(name))
            .collect::<Result<Vec<usize>>>()?;

        let mut report = ImputationReport {
            strategy,
            filled: IndexMap::new(),
            unfillable: Vec::new(),
            rows_dropped: 0,
            converted_to_int: Vec::new(),
            remaining_missing: 0,
        };

        if strategy == ImputeStrategy::Drop {
            let keep: Vec<bool> = self
                .table
                .rows()
                .iter()
                .map(|row| !row.iter().any(Value::is_null))
                .collect();
            report.rows_dropped = self.table.retain_rows(&keep);
        } else {
            for col in 0..self.table.column_count() {
                let name = self.table.headers()[col].clone();
                let nulls = self.table.column_values(col).filter(|v| v.is_null()).count();
                if nulls == 0 {
                    continue;
                }
                match self.fill_value(col, strategy) {
                    Some(fill) => {
                        if matches!(fill, Value::Float(_)) {
                            self.table.map_column(col, |v| match v {
                                Value::Int(i) => Value::Float(*i as f64),
                                other => other.clone(),
                            });
                        }
                        self.table.map_column(col, |v| {
                            if v.is_null() { fill.clone() } else { v.clone() }
                        });
                        report.filled.insert(name, nulls);
                    }
                    None => report.unfillable.push(name),
                }
            }
        }

        let mut converted = 0;
        for &col in &int_columns {
            converted += self.table.map_column(col, |v| match v {
                Value::Float(f) if f.is_finite() => Value::Int(f.round() as i64),
                other => other.clone(),
            });
            report
                .converted_to_int
                .push(self.table.headers()[col].clone());
        }

        if !report.unfillable.is_empty() {
            warn!(
                columns = ?report.unfillable,
                "columns have no values to impute from, left unchanged"
            );
        }

        report.remaining_missing = self
            .table
            .rows()
            .iter()
            .map(|row| row.iter().filter(|v| v.is_null()).count())
            .sum();

        let filled: usize = report.filled.values().sum();
        self.commit(
            TransformChange::new(
                "handle_missing",
                format!(
                    "Strategy '{}': filled {} value(s), dropped {} row(s), {} still missing",
                    strategy, filled, report.rows_dropped, report.remaining_missing
                ),
            )
            .with_columns(report.filled.keys().cloned())
            .with_rows_removed(report.rows_dropped)
            .with_values_changed(filled + converted),
        );

        Ok(report)
    }

    /// Value used to fill a column's nulls, or `None` when the column has
    /// no non-null values.
    fn fill_value(&self, col: usize, strategy: ImputeStrategy) -> Option<Value> {
        let column_type = self.table.column_type(col);
        if column_type == ColumnType::Unknown {
            return None;
        }

        let numeric = column_type.kind() == ColumnKind::Numeric;
        let values = || -> Vec<f64> {
            self.table
                .numeric_values(col)
                .into_iter()
                .map(|(_, x)| x)
                .collect()
        };
        match strategy {
            ImputeStrategy::Mean if numeric => stats::mean(&values()).map(Value::Float),
            ImputeStrategy::Median if numeric => stats::median(&values()).map(Value::Float),
            _ => stats::mode(self.table.column_values(col)),
        }
    }
}
