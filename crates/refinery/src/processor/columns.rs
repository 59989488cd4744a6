//! Column removal and index promotion.

use tracing::warn;

use crate::audit::TransformChange;
use crate::error::Result;
use crate::table::{ColumnList, Index};

use super::TableProcessor;

impl TableProcessor {
    /// Drop one or more columns. Names that are not in the table are
    /// skipped and reported, never an error. The change is recorded even
    /// when nothing matched, so skipped names stay in the history.
    pub fn drop_columns(&mut self, columns: impl Into<ColumnList>) -> &mut Self {
        let columns = columns.into();
        let mut dropped = Vec::new();
        let mut missing = Vec::new();

        for name in &columns {
            match self.table.column_index(name) {
                Some(col) => {
                    self.table.take_column(col);
                    dropped.push(name.clone());
                }
                None if dropped.contains(name) => {}
                None => missing.push(name.clone()),
            }
        }

        if !missing.is_empty() {
            warn!(columns = ?missing, "columns not found, skipped");
        }

        let description = if missing.is_empty() {
            format!("Dropped {} column(s)", dropped.len())
        } else {
            format!(
                "Dropped {} column(s); not found: {}",
                dropped.len(),
                missing.join(", ")
            )
        };
        self.commit(
            TransformChange::new("drop_columns", description)
                .with_columns(columns.iter())
                .with_columns_removed(dropped),
        );
        self
    }

    /// Promote a column to the index as-is.
    pub fn set_index_column(&mut self, column: &str) -> Result<&mut Self> {
        let col = self.table.require_column(column)?;
        if let Some((name, values)) = self.table.take_column(col) {
            self.table.set_index(Index::named(name.clone(), values))?;
            self.commit(
                TransformChange::new("set_index", format!("Index set to column '{}'", name))
                    .with_columns([name.as_str()])
                    .with_columns_removed(vec![name.clone()]),
            );
        }
        Ok(self)
    }
}
