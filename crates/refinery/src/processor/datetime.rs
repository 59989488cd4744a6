//! Datetime index coercion and date-range filtering.

use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::audit::TransformChange;
use crate::error::{RefineryError, Result};
use crate::io::SaveFormat;
use crate::table::parse::{coerce_temporal, parse_temporal};
use crate::table::{DataTable, Index, Value};

use super::TableProcessor;

/// Options for [`TableProcessor::set_index_date`].
#[derive(Debug, Clone)]
pub struct DateIndexOptions {
    /// Write rows that fail coercion to `log_path` before dropping them.
    pub log_invalid: bool,
    /// Destination for the failed-row log; `None` uses the configured
    /// default. The extension picks CSV or XLSX; anything else is CSV.
    pub log_path: Option<PathBuf>,
    /// Check that the resulting index is temporal.
    pub validate_after: bool,
    /// Truncate date-times to calendar dates.
    pub force_plain_date: bool,
    /// Remove rows that fail coercion (otherwise they keep a null label).
    pub drop_invalid: bool,
}

impl Default for DateIndexOptions {
    fn default() -> Self {
        Self {
            log_invalid: false,
            log_path: None,
            validate_after: true,
            force_plain_date: false,
            drop_invalid: true,
        }
    }
}

impl DateIndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log failed rows to `path`.
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_invalid = true;
        self.log_path = Some(path.into());
        self
    }

    pub fn log_invalid(mut self, enabled: bool) -> Self {
        self.log_invalid = enabled;
        self
    }

    pub fn validate_after(mut self, enabled: bool) -> Self {
        self.validate_after = enabled;
        self
    }

    pub fn force_plain_date(mut self, enabled: bool) -> Self {
        self.force_plain_date = enabled;
        self
    }

    pub fn drop_invalid(mut self, enabled: bool) -> Self {
        self.drop_invalid = enabled;
        self
    }
}

impl TableProcessor {
    /// Coerce a column to dates and promote it to the index.
    ///
    /// Coercion is row by row: cells that cannot be read as a date become
    /// null. Failed rows are optionally written to a log (with their
    /// original values) and are dropped unless `drop_invalid` is off.
    pub fn set_index_date(&mut self, column: &str, options: DateIndexOptions) -> Result<&mut Self> {
        let col = self.table.require_column(column)?;

        let labels: Vec<Value> = self
            .table
            .column_values(col)
            .map(|v| match coerce_temporal(v) {
                Some(Value::DateTime(dt)) if options.force_plain_date => Value::Date(dt.date()),
                Some(v) => v,
                None => Value::Null,
            })
            .collect();

        let invalid: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_null())
            .map(|(i, _)| i)
            .collect();

        let kept_labels: Vec<Value> = if options.drop_invalid {
            labels.iter().filter(|l| !l.is_null()).cloned().collect()
        } else {
            labels.clone()
        };
        let index = Index::named(column, kept_labels);
        if options.validate_after && !index.is_temporal() {
            return Err(RefineryError::IndexNotDatetime(format!(
                "column '{}' has no parseable dates",
                column
            )));
        }

        if !invalid.is_empty() {
            warn!(
                column,
                count = invalid.len(),
                "rows could not be converted to datetime"
            );
            if options.log_invalid {
                let path = options
                    .log_path
                    .clone()
                    .unwrap_or_else(|| self.config.invalid_datetime_log.clone());
                let format = SaveFormat::from_path(&path).unwrap_or(SaveFormat::Csv);
                let rows = self.table.select_rows(&invalid);
                self.write_rows(&rows, &path, format)?;
                info!(path = %path.display(), rows = invalid.len(), "invalid datetime rows saved");
            }
        }

        // Arguments are validated and the log is written; commit.
        self.table.take_column(col);
        let rows_removed = if options.drop_invalid {
            self.table.remove_rows(&invalid)
        } else {
            0
        };
        self.table.set_index(index)?;
        if rows_removed > 0 && self.table.is_empty() {
            warn!(column, rows_removed, "all rows dropped: no value could be converted to datetime");
        }

        self.commit(
            TransformChange::new(
                "set_index_date",
                format!(
                    "Index set to datetime column '{}' ({} unparseable row(s))",
                    column,
                    invalid.len()
                ),
            )
            .with_columns([column])
            .with_rows_removed(rows_removed)
            .with_columns_removed(vec![column.to_string()]),
        );
        Ok(self)
    }

    /// True when the index holds dates or date-times.
    pub fn index_is_datetime(&self) -> bool {
        self.table.index().name().is_some() && self.table.index().is_temporal()
    }

    /// Rows whose index date lies in `[start, end]`, inclusive. A date-only
    /// `end` covers its whole day. Rows with a null label are excluded.
    /// Does not modify the table.
    pub fn filter_by_date_range(&self, start: &str, end: &str) -> Result<DataTable> {
        if !self.index_is_datetime() {
            return Err(RefineryError::IndexNotDatetime(
                "set a datetime index before filtering by date".to_string(),
            ));
        }

        let bound = |s: &str| {
            parse_temporal(s)
                .ok_or_else(|| RefineryError::InvalidArgument(format!("unparseable date '{}'", s)))
        };
        let start = bound(start)?
            .as_datetime()
            .unwrap_or(NaiveDateTime::MIN);
        // A plain end date is exclusive of the following midnight.
        let (limit, inclusive) = match bound(end)? {
            Value::Date(day) => match day.succ_opt() {
                Some(next) => (next.and_time(NaiveTime::MIN), false),
                None => (NaiveDateTime::MAX, true),
            },
            other => (other.as_datetime().unwrap_or(NaiveDateTime::MAX), true),
        };
        let within = |t: NaiveDateTime| t >= start && (t < limit || (inclusive && t == limit));

        let positions: Vec<usize> = self
            .table
            .index()
            .labels()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_datetime().is_some_and(|t| within(t)))
            .map(|(i, _)| i)
            .collect();

        Ok(self.table.select_rows(&positions))
    }
}
