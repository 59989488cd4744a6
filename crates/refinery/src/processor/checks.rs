//! Read-only diagnostic pass over the whole table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::table::ColumnKind;

use super::TableProcessor;
use super::duplicates::{DuplicateReport, Keep};
use super::missing::MissingReport;
use super::outliers::OutlierReport;

/// Everything [`TableProcessor::run_all_checks`] found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub dtypes: IndexMap<String, ColumnKind>,
    /// Categorical columns with their distinct-value counts.
    pub categorical: IndexMap<String, usize>,
    pub missing: MissingReport,
    /// Full-row duplicates, every occurrence counted.
    pub duplicates: DuplicateReport,
    /// Z-score outliers at the configured threshold.
    pub outliers: OutlierReport,
    pub index_is_datetime: bool,
}

impl QualityReport {
    /// True when nothing is missing, duplicated or out of range.
    pub fn is_clean(&self) -> bool {
        self.missing.total == 0 && self.duplicates.count == 0 && self.outliers.rows.is_empty()
    }
}

impl TableProcessor {
    /// Run every inspection in a fixed order without changing the table:
    /// dtypes, categorical columns, missing values, duplicates, outliers.
    pub fn run_all_checks(&self) -> Result<QualityReport> {
        let dtypes = self.dtype_summary();
        let categorical = self.categorical_columns();
        let missing = self.missing_report();
        let duplicates = self.duplicate_report(None, Keep::None)?;
        let outliers = self.check_outliers(self.config.z_threshold);

        let report = QualityReport {
            row_count: self.table.row_count(),
            column_count: self.table.column_count(),
            dtypes,
            categorical,
            missing,
            duplicates,
            outliers,
            index_is_datetime: self.index_is_datetime(),
        };
        info!(
            missing = report.missing.total,
            duplicates = report.duplicates.count,
            outlier_rows = report.outliers.total_rows(),
            "all checks completed"
        );
        Ok(report)
    }
}
