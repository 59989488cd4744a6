//! The stateful cleaning session.
//!
//! A [`TableProcessor`] owns one table and applies inspection, repair and
//! filtering operations to it in sequence. Mutating operations take
//! `&mut self` and return `&mut Self` so calls chain:
//!
//! ```no_run
//! use refinery::{ImputeStrategy, TableProcessor};
//!
//! # fn main() -> refinery::Result<()> {
//! let mut processor = TableProcessor::open("sales.csv")?;
//! processor
//!     .drop_columns(["notes", "internal_id"])
//!     .handle_missing(ImputeStrategy::Median, &[])?
//!     .remove_outliers_zscore(3.0);
//! processor.save("sales_clean.csv", "csv".parse()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! Every operation validates its arguments before touching the table, so
//! an `Err` leaves the session unchanged.

mod checks;
mod columns;
mod datetime;
mod duplicates;
mod inspect;
mod missing;
mod normalize;
mod outliers;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditLog, TransformChange};
use crate::error::{RefineryError, Result};
use crate::io::{
    FileLoader, FileWriter, ParserConfig, SaveFormat, SourceMetadata, TableLoader, TableWriter,
};
use crate::table::DataTable;
use crate::table::parse::DEFAULT_NULL_TOKENS;
use crate::viz::{ComparisonRenderer, PlotKind};

pub use checks::QualityReport;
pub use datetime::DateIndexOptions;
pub use duplicates::{DuplicateMethod, DuplicateReport, Keep};
pub use missing::{ImputationReport, ImputeStrategy, MissingReport};
pub use outliers::{ColumnOutliers, OutlierMethod, OutlierReport};

/// Configuration for a cleaning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Default z-score threshold for outlier checks.
    pub z_threshold: f64,
    /// Default IQR fence multiplier.
    pub iqr_multiplier: f64,
    /// Strings read as missing when loading text.
    pub null_tokens: Vec<String>,
    /// Directory for duplicate logs when none is given.
    pub log_dir: PathBuf,
    /// Name of the column written by the `flag` duplicate method.
    pub flag_column: String,
    /// Default destination for rows that fail date coercion.
    pub invalid_datetime_log: PathBuf,
    /// Delimited-text parser settings.
    pub parser: ParserConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            iqr_multiplier: 1.5,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
            log_dir: PathBuf::from("logs"),
            flag_column: "is_duplicate".to_string(),
            invalid_datetime_log: PathBuf::from("invalid_datetime_rows.csv"),
            parser: ParserConfig::default(),
        }
    }
}

/// Builder for [`TableProcessor`].
///
/// Exactly one of [`path`](Self::path) and [`dataset`](Self::dataset) must
/// be set.
#[derive(Default)]
pub struct TableProcessorBuilder {
    path: Option<PathBuf>,
    dataset: Option<DataTable>,
    config: ProcessorConfig,
    loader: Option<Box<dyn TableLoader>>,
    writer: Option<Box<dyn TableWriter>>,
}

impl TableProcessorBuilder {
    /// Load the table from a file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use an in-memory table.
    pub fn dataset(mut self, table: DataTable) -> Self {
        self.dataset = Some(table);
        self
    }

    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default file loader.
    pub fn loader(mut self, loader: impl TableLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Replace the default file writer.
    pub fn writer(mut self, writer: impl TableWriter + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Result<TableProcessor> {
        let (table, source) = match (self.path, self.dataset) {
            (None, None) => return Err(RefineryError::MissingSource),
            (Some(_), Some(_)) => return Err(RefineryError::AmbiguousSource),
            (None, Some(table)) => (table, None),
            (Some(path), None) => {
                let (table, source) = match self.loader {
                    Some(loader) => loader.load(&path)?,
                    None => FileLoader::new()
                        .with_parser_config(self.config.parser.clone())
                        .with_null_tokens(self.config.null_tokens.clone())
                        .load(&path)?,
                };
                info!(
                    file = %source.file,
                    rows = source.row_count,
                    columns = source.column_count,
                    hash = %source.hash,
                    "data loaded"
                );
                (table, Some(source))
            }
        };

        Ok(TableProcessor {
            table,
            config: self.config,
            history: AuditLog::with_source(source.clone()),
            source,
            writer: self
                .writer
                .unwrap_or_else(|| Box::new(FileWriter)),
        })
    }
}

/// A cleaning session over one in-memory table.
pub struct TableProcessor {
    table: DataTable,
    config: ProcessorConfig,
    source: Option<SourceMetadata>,
    history: AuditLog,
    writer: Box<dyn TableWriter>,
}

impl fmt::Debug for TableProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableProcessor")
            .field("rows", &self.table.row_count())
            .field("columns", &self.table.column_count())
            .field("source", &self.source.as_ref().map(|s| &s.file))
            .field("operations", &self.history.operations_applied)
            .finish()
    }
}

impl TableProcessor {
    pub fn builder() -> TableProcessorBuilder {
        TableProcessorBuilder::default()
    }

    /// Load a file with the default configuration.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().path(path).build()
    }

    /// Wrap an in-memory table with the default configuration.
    pub fn from_table(table: DataTable) -> Result<Self> {
        Self::builder().dataset(table).build()
    }

    /// The current table.
    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// Owned copy of the current table, for before/after comparisons.
    pub fn snapshot(&self) -> DataTable {
        self.table.clone()
    }

    pub fn into_table(self) -> DataTable {
        self.table
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Metadata of the loaded file, if the table came from one.
    pub fn source(&self) -> Option<&SourceMetadata> {
        self.source.as_ref()
    }

    /// Every committed operation, in order.
    pub fn history(&self) -> &AuditLog {
        &self.history
    }

    /// Write the audit trail as pretty JSON.
    pub fn save_history(&self, path: impl AsRef<Path>) -> Result<()> {
        self.history.save(path)
    }

    /// Persist the current table. A named index is written as the first
    /// column.
    pub fn save(&self, path: impl AsRef<Path>, format: SaveFormat) -> Result<()> {
        let path = path.as_ref();
        self.writer.write(&self.table, path, format, true)?;
        info!(
            path = %path.display(),
            format = %format,
            rows = self.table.row_count(),
            "data saved"
        );
        Ok(())
    }

    /// Render `column` of `before` next to the current table.
    pub fn visualize(
        &self,
        renderer: &mut dyn ComparisonRenderer,
        before: &DataTable,
        column: &str,
        kind: PlotKind,
    ) -> Result<()> {
        before.require_column(column)?;
        self.numeric_column(column)?;
        renderer.render(before, &self.table, column, kind)
    }

    /// Position of a numeric column, or the matching error.
    fn numeric_column(&self, name: &str) -> Result<usize> {
        let col = self.table.require_column(name)?;
        if !self.table.column_type(col).is_numeric() {
            return Err(RefineryError::NotNumericColumn(name.to_string()));
        }
        Ok(col)
    }

    /// Positions of every numeric column.
    fn numeric_columns(&self) -> Vec<usize> {
        (0..self.table.column_count())
            .filter(|&c| self.table.column_type(c).is_numeric())
            .collect()
    }

    /// Write rows through the session's writer, without the index.
    fn write_rows(&self, rows: &DataTable, path: &Path, format: SaveFormat) -> Result<()> {
        self.writer.write(rows, path, format, false)
    }

    /// Record a committed change in the audit trail and emit it as an event.
    fn commit(&mut self, change: TransformChange) {
        info!(
            operation = %change.operation,
            rows_removed = change.rows_removed,
            values_changed = change.values_changed,
            columns_added = change.columns_added.len(),
            columns_removed = change.columns_removed.len(),
            rows_remaining = self.table.row_count(),
            "{}",
            change.description
        );
        self.history.record(change);
    }
}
