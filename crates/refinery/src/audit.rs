//! Audit trail of committed operations, with JSON persistence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RefineryError, Result};
use crate::io::SourceMetadata;

/// A single committed change to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChange {
    /// Operation name (e.g. `handle_missing`).
    pub operation: String,

    /// Description of the change.
    pub description: String,

    /// Columns the operation looked at.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,

    /// Number of rows removed.
    pub rows_removed: usize,

    /// Columns added to the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_added: Vec<String>,

    /// Columns removed from the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_removed: Vec<String>,

    /// Number of cell values changed in place.
    pub values_changed: usize,

    /// When the change was committed.
    pub applied_at: DateTime<Utc>,
}

impl TransformChange {
    pub fn new(operation: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            description: description.into(),
            columns: Vec::new(),
            rows_removed: 0,
            columns_added: Vec::new(),
            columns_removed: Vec::new(),
            values_changed: 0,
            applied_at: Utc::now(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rows_removed(mut self, count: usize) -> Self {
        self.rows_removed = count;
        self
    }

    pub fn with_columns_added(mut self, columns: Vec<String>) -> Self {
        self.columns_added = columns;
        self
    }

    pub fn with_columns_removed(mut self, columns: Vec<String>) -> Self {
        self.columns_removed = columns;
        self
    }

    pub fn with_values_changed(mut self, count: usize) -> Self {
        self.values_changed = count;
        self
    }
}

/// Ordered record of every change applied in a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    /// Where the data came from, when loaded from a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,

    /// Number of operations recorded.
    pub operations_applied: usize,

    /// Total rows removed across all operations.
    pub rows_removed: usize,

    /// Total values changed across all operations.
    pub values_changed: usize,

    /// Changes in the order they were committed.
    pub changes: Vec<TransformChange>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Option<SourceMetadata>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Add a change to the log.
    pub fn record(&mut self, change: TransformChange) {
        self.operations_applied += 1;
        self.rows_removed += change.rows_removed;
        self.values_changed += change.values_changed;
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[TransformChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Save the log as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RefineryError::io(parent, e))?;
            }
        }

        let file = File::create(path).map_err(|e| RefineryError::io(path, e))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;

        Ok(())
    }

    /// Load a log previously written by [`AuditLog::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RefineryError::io(path, e))?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
