//! Refinery: a stateful cleaning engine for in-memory tabular datasets.
//!
//! A [`TableProcessor`] holds one table, loaded from CSV, TSV, JSON or a
//! spreadsheet (or supplied in memory), and applies a sequence of
//! inspection and repair operations to it.
//!
//! # Core Principles
//!
//! - **Fluent**: mutating calls return `&mut Self` and chain
//! - **Fail before mutating**: arguments are validated up front; an `Err`
//!   leaves the table as it was
//! - **Row-level tolerance**: a malformed cell is nulled, logged or dropped
//!   per policy and never aborts a bulk operation
//! - **Full provenance**: every committed change is recorded in an
//!   [`AuditLog`]
//!
//! # Example
//!
//! ```no_run
//! use refinery::{DateIndexOptions, DuplicateMethod, ImputeStrategy, SaveFormat, TableProcessor};
//!
//! let mut processor = TableProcessor::open("readings.csv").unwrap();
//! processor
//!     .set_index_date("timestamp", DateIndexOptions::new())
//!     .unwrap()
//!     .handle_missing(ImputeStrategy::Mean, &["count"])
//!     .unwrap()
//!     .resolve_duplicates(DuplicateMethod::KeepFirst)
//!     .unwrap()
//!     .remove_outliers_zscore(3.0);
//!
//! let report = processor.run_all_checks().unwrap();
//! println!("Missing values left: {}", report.missing.total);
//! processor.save("readings_clean.csv", SaveFormat::Csv).unwrap();
//! ```

pub mod audit;
pub mod error;
pub mod io;
pub mod processor;
pub mod stats;
pub mod table;
pub mod viz;

pub use audit::{AuditLog, TransformChange};
pub use error::{RefineryError, Result};
pub use io::{
    FileFormat, FileLoader, FileWriter, ParserConfig, SaveFormat, SourceMetadata, TableLoader,
    TableWriter,
};
pub use processor::{
    ColumnOutliers, DateIndexOptions, DuplicateMethod, DuplicateReport, ImputationReport,
    ImputeStrategy, Keep, MissingReport, OutlierMethod, OutlierReport, ProcessorConfig,
    QualityReport, TableProcessor, TableProcessorBuilder,
};
pub use table::{ColumnKind, ColumnList, ColumnType, DataTable, Index, MatchKey, Value};
pub use viz::{ComparisonRenderer, PlotKind, TextRenderer};
