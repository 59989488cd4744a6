//! Outlier detection (z-score and IQR) and removal.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::TransformChange;
use crate::error::Result;
use crate::io::SaveFormat;
use crate::stats::{self, IqrBounds, StreamingStats};
use crate::table::DataTable;

use super::TableProcessor;

/// Detection method and its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    ZScore { threshold: f64 },
    Iqr { multiplier: f64 },
}

/// Outliers found in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub count: usize,
    /// Row positions, ascending.
    pub rows: Vec<usize>,
    /// Values below this are outliers (absent for a degenerate column).
    pub lower: Option<f64>,
    /// Values above this are outliers (absent for a degenerate column).
    pub upper: Option<f64>,
}

/// Outliers across the numeric columns of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    /// Every numeric column, in column order, including those with none.
    pub columns: IndexMap<String, ColumnOutliers>,
    /// Union of flagged row positions, ascending.
    pub rows: Vec<usize>,
}

impl OutlierReport {
    /// Number of distinct rows flagged in any column.
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Columns with at least one outlier.
    pub fn flagged_columns(&self) -> impl Iterator<Item = (&String, &ColumnOutliers)> {
        self.columns.iter().filter(|(_, c)| c.count > 0)
    }
}

/// Z-score outliers of one column.
fn zscore_column(table: &DataTable, col: usize, threshold: f64) -> ColumnOutliers {
    let values = table.numeric_values(col);
    let rows = stats::zscore_outliers(&values, threshold);

    let summary: StreamingStats = values.iter().map(|&(_, x)| x).collect();
    let bounds = match (summary.mean(), summary.std()) {
        (Some(mean), Some(std)) if std > 0.0 && std.is_finite() => {
            (Some(mean - threshold * std), Some(mean + threshold * std))
        }
        _ => (None, None),
    };

    ColumnOutliers {
        count: rows.len(),
        rows,
        lower: bounds.0,
        upper: bounds.1,
    }
}

/// IQR outliers of one column.
fn iqr_column(table: &DataTable, col: usize, multiplier: f64) -> ColumnOutliers {
    let values = table.numeric_values(col);
    let xs: Vec<f64> = values.iter().map(|&(_, x)| x).collect();
    let Some(bounds) = IqrBounds::compute(&xs, multiplier) else {
        return ColumnOutliers {
            count: 0,
            rows: Vec::new(),
            lower: None,
            upper: None,
        };
    };

    let rows: Vec<usize> = values
        .iter()
        .filter(|&&(_, x)| bounds.is_outlier(x))
        .map(|&(pos, _)| pos)
        .collect();
    ColumnOutliers {
        count: rows.len(),
        rows,
        lower: Some(bounds.lower),
        upper: Some(bounds.upper),
    }
}

impl TableProcessor {
    fn outlier_report(&self, method: OutlierMethod) -> OutlierReport {
        let mut columns = IndexMap::new();
        let mut union = BTreeSet::new();

        for col in self.numeric_columns() {
            let found = match method {
                OutlierMethod::ZScore { threshold } => zscore_column(&self.table, col, threshold),
                OutlierMethod::Iqr { multiplier } => iqr_column(&self.table, col, multiplier),
            };
            debug!(column = %self.table.headers()[col], count = found.count, "outlier scan");
            union.extend(found.rows.iter().copied());
            columns.insert(self.table.headers()[col].clone(), found);
        }

        OutlierReport {
            method,
            columns,
            rows: union.into_iter().collect(),
        }
    }

    /// Z-score outliers in every numeric column.
    pub fn check_outliers(&self, z_thresh: f64) -> OutlierReport {
        let report = self.outlier_report(OutlierMethod::ZScore {
            threshold: z_thresh,
        });
        info!(
            threshold = z_thresh,
            rows = report.total_rows(),
            "z-score outlier check"
        );
        report
    }

    /// IQR outliers in every numeric column.
    pub fn check_outliers_iqr(&self, multiplier: f64) -> OutlierReport {
        let report = self.outlier_report(OutlierMethod::Iqr { multiplier });
        info!(multiplier, rows = report.total_rows(), "IQR outlier check");
        report
    }

    /// Rows flagged by [`check_outliers`](Self::check_outliers).
    pub fn outlier_rows(&self, z_thresh: f64) -> DataTable {
        let report = self.check_outliers(z_thresh);
        self.table.select_rows(&report.rows)
    }

    /// Write the rows flagged by [`check_outliers`](Self::check_outliers)
    /// to `path` (CSV or XLSX by extension). Returns how many rows were
    /// flagged; nothing is written when there are none.
    pub fn log_outliers(&self, z_thresh: f64, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let format = SaveFormat::from_path(path)?;
        let rows = self.outlier_rows(z_thresh);
        if rows.is_empty() {
            return Ok(0);
        }
        self.write_rows(&rows, path, format)?;
        info!(path = %path.display(), rows = rows.row_count(), "outliers logged");
        Ok(rows.row_count())
    }

    /// Remove every row that is a z-score outlier in any numeric column.
    pub fn remove_outliers_zscore(&mut self, z_thresh: f64) -> &mut Self {
        let report = self.check_outliers(z_thresh);
        let columns: Vec<String> = report.flagged_columns().map(|(c, _)| c.clone()).collect();
        let removed = self.table.remove_rows(&report.rows);
        self.commit(
            TransformChange::new(
                "remove_outliers_zscore",
                format!(
                    "Removed {} outlier row(s) with |z| > {}",
                    removed, z_thresh
                ),
            )
            .with_columns(columns)
            .with_rows_removed(removed),
        );
        self
    }

    /// Remove z-score outliers of one column.
    pub fn remove_outliers_from_column(&mut self, column: &str, z_thresh: f64) -> Result<&mut Self> {
        let col = self.numeric_column(column)?;
        let found = zscore_column(&self.table, col, z_thresh);
        let removed = self.table.remove_rows(&found.rows);
        self.commit(
            TransformChange::new(
                "remove_outliers_from_column",
                format!(
                    "Removed {} outlier row(s) in '{}' with |z| > {}",
                    removed, column, z_thresh
                ),
            )
            .with_columns([column])
            .with_rows_removed(removed),
        );
        Ok(self)
    }

    /// Remove rows outside the IQR fences of one column. Nulls are kept.
    pub fn remove_outliers_iqr(&mut self, column: &str, multiplier: f64) -> Result<&mut Self> {
        self.extract_outliers_iqr(column, multiplier, None)?;
        Ok(self)
    }

    /// Remove rows outside the IQR fences of one column and return them.
    ///
    /// With a `log_path` the removed rows are written there (CSV or XLSX by
    /// extension) before the table is changed.
    pub fn extract_outliers_iqr(
        &mut self,
        column: &str,
        multiplier: f64,
        log_path: Option<&Path>,
    ) -> Result<DataTable> {
        let col = self.numeric_column(column)?;
        let found = iqr_column(&self.table, col, multiplier);
        let extracted = self.table.select_rows(&found.rows);

        if let Some(path) = log_path {
            let format = SaveFormat::from_path(path)?;
            self.write_rows(&extracted, path, format)?;
        }

        let removed = self.table.remove_rows(&found.rows);
        let fences = match (found.lower, found.upper) {
            (Some(lo), Some(hi)) => format!(" outside [{}, {}]", lo, hi),
            _ => String::new(),
        };
        self.commit(
            TransformChange::new(
                "remove_outliers_iqr",
                format!(
                    "Removed {} outlier row(s) in '{}'{} (k = {})",
                    removed, column, fences, multiplier
                ),
            )
            .with_columns([column])
            .with_rows_removed(removed),
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::processor;
    use super::*;
    use crate::error::RefineryError;
    use crate::table::Value;
    use tempfile::TempDir;

    fn spiky() -> TableProcessor {
        let mut values: Vec<Value> = vec![Value::Int(10); 9];
        values.push(Value::Int(100));
        let mut other: Vec<Value> = (0..10).map(|i| Value::Float(i as f64)).collect();
        other[3] = Value::Null;
        processor(vec![
            ("x", values),
            ("y", other),
            ("label", (0..10).map(|i| Value::from(format!("r{}", i))).collect()),
        ])
    }

    #[test]
    fn test_check_then_remove_leaves_no_flagged_rows() {
        let mut p = spiky();
        let report = p.check_outliers(2.0);
        assert_eq!(report.columns["x"].rows, vec![9]);
        assert!(!report.columns.contains_key("label"));

        let flagged = p.outlier_rows(2.0);
        p.remove_outliers_zscore(2.0);
        for label in flagged.index().labels() {
            assert!(!p.table().index().labels().contains(label));
        }
        assert_eq!(p.table().row_count(), 9);
    }

    #[test]
    fn test_infinite_threshold_removes_nothing() {
        let mut p = spiky();
        p.remove_outliers_zscore(f64::INFINITY);
        assert_eq!(p.table().row_count(), 10);
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let p = processor(vec![("c", vec![Value::Int(5); 4])]);
        let report = p.check_outliers(0.0);
        assert_eq!(report.columns["c"].count, 0);
        assert_eq!(report.columns["c"].lower, None);
    }

    #[test]
    fn test_iqr_zero_multiplier() {
        let mut p = processor(vec![(
            "v",
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(4),
                Value::Int(100),
                Value::Null,
            ],
        )]);
        let removed = p.extract_outliers_iqr("v", 0.0, None).unwrap();
        assert_eq!(
            removed.column("v").unwrap(),
            vec![&Value::Int(1), &Value::Int(100)]
        );
        // Null rows are retained.
        assert_eq!(p.table().row_count(), 4);
    }

    #[test]
    fn test_iqr_default_multiplier_keeps_small_values() {
        let mut p = processor(vec![(
            "v",
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4), Value::Int(100)],
        )]);
        p.remove_outliers_iqr("v", 1.5).unwrap();
        assert_eq!(
            p.table().column("v").unwrap(),
            vec![&Value::Int(1), &Value::Int(2), &Value::Int(3), &Value::Int(4)]
        );
    }

    #[test]
    fn test_column_validation() {
        let mut p = spiky();
        assert!(matches!(
            p.remove_outliers_from_column("label", 2.0),
            Err(RefineryError::NotNumericColumn(_))
        ));
        assert!(matches!(
            p.remove_outliers_iqr("nope", 1.5),
            Err(RefineryError::UnknownColumn(_))
        ));
        assert!(p.history().is_empty());

        p.remove_outliers_from_column("x", 2.0).unwrap();
        assert_eq!(p.table().row_count(), 9);
    }

    #[test]
    fn test_log_outliers_and_extract_with_log() {
        let temp_dir = TempDir::new().unwrap();
        let p = spiky();
        let path = temp_dir.path().join("outliers.csv");
        assert_eq!(p.log_outliers(2.0, &path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("x,y,label\n100,"));

        assert!(matches!(
            p.log_outliers(2.0, temp_dir.path().join("outliers.txt")),
            Err(RefineryError::UnsupportedFormat(_))
        ));

        let mut p = spiky();
        let log = temp_dir.path().join("iqr.csv");
        let extracted = p.extract_outliers_iqr("x", 1.5, Some(&log)).unwrap();
        assert_eq!(extracted.row_count(), 1);
        assert!(log.exists());
    }
}
