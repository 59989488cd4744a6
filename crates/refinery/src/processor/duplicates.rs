//! Duplicate rows and duplicate columns.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::TransformChange;
use crate::error::{RefineryError, Result};
use crate::io::SaveFormat;
use crate::table::{ColumnList, DataTable, MatchKey, Value};

use super::TableProcessor;

/// Which occurrences of a duplicated key are reported (or removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keep {
    /// Every occurrence except the first.
    First,
    /// Every occurrence except the last.
    Last,
    /// Every occurrence.
    None,
}

impl FromStr for Keep {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Keep::First),
            "last" => Ok(Keep::Last),
            "none" | "false" | "all" => Ok(Keep::None),
            _ => Err(RefineryError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Keep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keep::First => f.write_str("first"),
            Keep::Last => f.write_str("last"),
            Keep::None => f.write_str("none"),
        }
    }
}

/// How duplicate rows are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMethod {
    KeepFirst,
    KeepLast,
    /// Remove every row whose key occurs more than once.
    DropAll,
    /// Add a boolean marker column instead of removing rows.
    Flag,
}

impl FromStr for DuplicateMethod {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_first" => Ok(DuplicateMethod::KeepFirst),
            "keep_last" => Ok(DuplicateMethod::KeepLast),
            "drop_all" => Ok(DuplicateMethod::DropAll),
            "flag" => Ok(DuplicateMethod::Flag),
            _ => Err(RefineryError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for DuplicateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DuplicateMethod::KeepFirst => "keep_first",
            DuplicateMethod::KeepLast => "keep_last",
            DuplicateMethod::DropAll => "drop_all",
            DuplicateMethod::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// Rows matched as duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Key columns.
    pub subset: Vec<String>,
    pub keep: Keep,
    /// Row positions of the matched rows, ascending.
    pub rows: Vec<usize>,
    pub count: usize,
}

/// Mark rows whose key was seen elsewhere, per the retention policy.
///
/// The key of a row is the tuple of its values in `key_columns`, compared
/// by value (see [`Value::match_key`]). Nulls compare equal to each other.
pub(crate) fn duplicate_mask(table: &DataTable, key_columns: &[usize], keep: Keep) -> Vec<bool> {
    let mut groups: HashMap<Vec<MatchKey<'_>>, Vec<usize>> = HashMap::new();
    for (pos, row) in table.rows().iter().enumerate() {
        let key: Vec<MatchKey<'_>> = key_columns.iter().map(|&c| row[c].match_key()).collect();
        groups.entry(key).or_default().push(pos);
    }

    let mut mask = vec![false; table.row_count()];
    for positions in groups.values().filter(|p| p.len() > 1) {
        let marked = match keep {
            Keep::First => &positions[1..],
            Keep::Last => &positions[..positions.len() - 1],
            Keep::None => &positions[..],
        };
        for &pos in marked {
            mask[pos] = true;
        }
    }
    mask
}

fn positions(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, m)| **m)
        .map(|(i, _)| i)
        .collect()
}

impl TableProcessor {
    /// Resolve the key columns. `None` or an empty list means every column
    /// except the duplicate marker column.
    fn key_columns(&self, subset: Option<&ColumnList>) -> Result<(Vec<String>, Vec<usize>)> {
        match subset.filter(|s| !s.is_empty()) {
            Some(names) => {
                let cols = names
                    .iter()
                    .map(|n| self.table.require_column(n))
                    .collect::<Result<Vec<_>>>()?;
                Ok((names.names().to_vec(), cols))
            }
            None => Ok(self
                .table
                .headers()
                .iter()
                .enumerate()
                .filter(|(_, h)| **h != self.config.flag_column)
                .map(|(c, h)| (h.clone(), c))
                .unzip()),
        }
    }

    /// Find duplicate rows over `subset` (all columns when `None`).
    pub fn duplicate_report(&self, subset: Option<ColumnList>, keep: Keep) -> Result<DuplicateReport> {
        let (names, cols) = self.key_columns(subset.as_ref())?;
        let rows = positions(&duplicate_mask(&self.table, &cols, keep));
        info!(count = rows.len(), keep = %keep, "duplicate rows found");
        Ok(DuplicateReport {
            subset: names,
            keep,
            count: rows.len(),
            rows,
        })
    }

    /// The duplicate rows themselves.
    pub fn duplicate_rows(&self, subset: Option<ColumnList>, keep: Keep) -> Result<DataTable> {
        let report = self.duplicate_report(subset, keep)?;
        Ok(self.table.select_rows(&report.rows))
    }

    /// Resolve duplicates over full rows.
    pub fn resolve_duplicates(&mut self, method: DuplicateMethod) -> Result<&mut Self> {
        self.resolve_duplicates_on(None, method)
    }

    /// Resolve duplicates over `subset` (all columns when `None`).
    ///
    /// `Flag` writes a boolean marker column (later occurrences `true`),
    /// replacing any previous marker.
    pub fn resolve_duplicates_on(
        &mut self,
        subset: Option<ColumnList>,
        method: DuplicateMethod,
    ) -> Result<&mut Self> {
        let (names, cols) = self.key_columns(subset.as_ref())?;

        let mut change = TransformChange::new("resolve_duplicates", String::new()).with_columns(names);
        match method {
            DuplicateMethod::Flag => {
                let mask = duplicate_mask(&self.table, &cols, Keep::First);
                let flagged = mask.iter().filter(|m| **m).count();
                let flag_column = self.config.flag_column.clone();
                let added = self.table.column_index(&flag_column).is_none();
                self.table
                    .set_column(&flag_column, mask.into_iter().map(Value::Bool).collect())?;
                change.description =
                    format!("Flagged {} duplicate row(s) in '{}'", flagged, flag_column);
                change.values_changed = flagged;
                if added {
                    change.columns_added = vec![flag_column];
                }
            }
            _ => {
                let keep = match method {
                    DuplicateMethod::KeepFirst => Keep::First,
                    DuplicateMethod::KeepLast => Keep::Last,
                    _ => Keep::None,
                };
                let mask = duplicate_mask(&self.table, &cols, keep);
                let removed = self.table.remove_rows(&positions(&mask));
                change.description = format!("Removed {} duplicate row(s) ({})", removed, method);
                change.rows_removed = removed;
            }
        }

        self.commit(change);
        Ok(self)
    }

    /// Write duplicate rows to `log_dir`.
    ///
    /// Returns `Ok(None)` and writes nothing when there are no duplicates.
    /// Without a `filename` the log is named
    /// `duplicates_log_<YYYYmmdd_HHMMSS>.<ext>`; a given filename gets the
    /// extension appended when it is missing.
    pub fn log_duplicates(
        &self,
        subset: Option<ColumnList>,
        keep: Keep,
        log_dir: Option<&Path>,
        filename: Option<&str>,
        format: SaveFormat,
    ) -> Result<Option<PathBuf>> {
        let duplicates = self.duplicate_rows(subset, keep)?;
        if duplicates.is_empty() {
            info!("no duplicates found to log");
            return Ok(None);
        }

        let ext = format.extension();
        let filename = match filename {
            Some(name) if name.ends_with(&format!(".{}", ext)) => name.to_string(),
            Some(name) => format!("{}.{}", name, ext),
            None => format!(
                "duplicates_log_{}.{}",
                Local::now().format("%Y%m%d_%H%M%S"),
                ext
            ),
        };
        let dir = log_dir.unwrap_or(self.config.log_dir.as_path());
        let path = dir.join(filename);

        self.write_rows(&duplicates, &path, format)?;
        info!(path = %path.display(), rows = duplicates.row_count(), "duplicates logged");
        Ok(Some(path))
    }

    /// Groups of columns with identical content, compared by value, in
    /// declaration order.
    pub fn duplicate_columns(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut lookup: HashMap<Vec<MatchKey<'_>>, usize> = HashMap::new();

        for col in 0..self.table.column_count() {
            let values: Vec<MatchKey<'_>> = self
                .table
                .column_values(col)
                .map(Value::match_key)
                .collect();
            match lookup.get(&values) {
                Some(&g) => groups[g].push(col),
                None => {
                    lookup.insert(values, groups.len());
                    groups.push(vec![col]);
                }
            }
        }

        groups
            .into_iter()
            .filter(|cols| cols.len() > 1)
            .map(|cols| {
                cols.into_iter()
                    .map(|c| self.table.headers()[c].clone())
                    .collect()
            })
            .collect()
    }

    /// Drop duplicate columns: `First` keeps the first-declared member of
    /// each group, `Last` the last-declared, `None` drops every member.
    pub fn resolve_duplicate_columns(&mut self, keep: Keep) -> &mut Self {
        let groups = self.duplicate_columns();
        let mut to_drop: Vec<String> = Vec::new();
        for group in &groups {
            let dropped: &[String] = match keep {
                Keep::First => &group[1..],
                Keep::Last => &group[..group.len() - 1],
                Keep::None => &group[..],
            };
            to_drop.extend(dropped.iter().cloned());
        }

        for name in &to_drop {
            if let Some(col) = self.table.column_index(name) {
                self.table.take_column(col);
            }
        }

        if to_drop.is_empty() {
            info!("no duplicate columns found");
            return self;
        }
        warn!(columns = ?to_drop, "duplicate columns removed");
        self.commit(
            TransformChange::new(
                "resolve_duplicate_columns",
                format!(
                    "Removed {} duplicate column(s) from {} group(s), keep {}",
                    to_drop.len(),
                    groups.len(),
                    keep
                ),
            )
            .with_columns_removed(to_drop),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::processor;
    use super::*;
    use tempfile::TempDir;

    fn letters() -> TableProcessor {
        processor(vec![
            ("k", vec!["A".into(), "A".into(), "B".into()]),
            ("v", vec![Value::Int(1), Value::Int(1), Value::Int(2)]),
        ])
    }

    fn column(p: &TableProcessor, name: &str) -> Vec<Value> {
        p.table().column(name).unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn test_method_and_keep_from_str() {
        assert_eq!("drop_all".parse::<DuplicateMethod>().unwrap(), DuplicateMethod::DropAll);
        assert_eq!("last".parse::<Keep>().unwrap(), Keep::Last);
        assert!(matches!(
            "keep_some".parse::<DuplicateMethod>(),
            Err(RefineryError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_duplicate_report_keep_policies() {
        let p = letters();
        assert_eq!(p.duplicate_report(None, Keep::First).unwrap().rows, vec![1]);
        assert_eq!(p.duplicate_report(None, Keep::Last).unwrap().rows, vec![0]);
        assert_eq!(p.duplicate_report(None, Keep::None).unwrap().rows, vec![0, 1]);

        let err = p
            .duplicate_report(Some("nope".into()), Keep::First)
            .unwrap_err();
        assert!(matches!(err, RefineryError::UnknownColumn(_)));
    }

    #[test]
    fn test_drop_all_and_keep_first() {
        let mut p = letters();
        p.resolve_duplicates(DuplicateMethod::DropAll).unwrap();
        assert_eq!(column(&p, "k"), vec![Value::from("B")]);

        let mut p = letters();
        p.resolve_duplicates(DuplicateMethod::KeepFirst).unwrap();
        assert_eq!(column(&p, "k"), vec![Value::from("A"), Value::from("B")]);
        assert_eq!(p.table().index().labels(), &[Value::Int(0), Value::Int(2)]);
    }

    #[test]
    fn test_keep_last() {
        let mut p = letters();
        p.resolve_duplicates(DuplicateMethod::KeepLast).unwrap();
        assert_eq!(p.table().index().labels(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_flag_is_idempotent() {
        let mut p = letters();
        p.resolve_duplicates(DuplicateMethod::Flag).unwrap();
        let expected = vec![Value::Bool(false), Value::Bool(true), Value::Bool(false)];
        assert_eq!(column(&p, "is_duplicate"), expected);

        // The marker itself is not part of the key.
        p.resolve_duplicates(DuplicateMethod::Flag).unwrap();
        assert_eq!(column(&p, "is_duplicate"), expected);
        assert_eq!(p.table().column_count(), 3);
    }

    #[test]
    fn test_subset_key() {
        let mut p = processor(vec![
            ("k", vec!["A".into(), "A".into()]),
            ("v", vec![Value::Int(1), Value::Int(2)]),
        ]);
        assert_eq!(p.duplicate_report(None, Keep::First).unwrap().count, 0);
        p.resolve_duplicates_on(Some("k".into()), DuplicateMethod::KeepLast)
            .unwrap();
        assert_eq!(column(&p, "v"), vec![Value::Int(2)]);
    }

    #[test]
    fn test_log_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("logs");

        let p = letters();
        let path = p
            .log_duplicates(None, Keep::None, Some(&dir), Some("dups"), SaveFormat::Csv)
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.join("dups.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "k,v\nA,1\nA,1\n");

        let default_name = p
            .log_duplicates(None, Keep::First, Some(&dir), None, SaveFormat::Csv)
            .unwrap()
            .unwrap();
        let name = default_name.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("duplicates_log_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_log_duplicates_none_found() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("logs");
        let p = processor(vec![("k", vec!["A".into(), "B".into()])]);
        let result = p
            .log_duplicates(None, Keep::First, Some(&dir), None, SaveFormat::Csv)
            .unwrap();
        assert!(result.is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_duplicate_columns() {
        let mut p = processor(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("b", vec![Value::Int(5), Value::Int(6)]),
            ("a_copy", vec![Value::Int(1), Value::Int(2)]),
            ("a_again", vec![Value::Int(1), Value::Int(2)]),
        ]);
        assert_eq!(
            p.duplicate_columns(),
            vec![vec!["a".to_string(), "a_copy".to_string(), "a_again".to_string()]]
        );

        p.resolve_duplicate_columns(Keep::First);
        assert_eq!(p.table().headers(), &["a", "b"]);
    }

    #[test]
    fn test_duplicates_compare_numbers_by_value() {
        let mut p = processor(vec![(
            "k",
            vec![
                Value::Int(1),
                Value::Float(1.0),
                Value::Float(0.0),
                Value::Float(-0.0),
            ],
        )]);
        assert_eq!(p.duplicate_report(None, Keep::None).unwrap().count, 4);

        p.resolve_duplicates(DuplicateMethod::KeepFirst).unwrap();
        assert_eq!(column(&p, "k"), vec![Value::Int(1), Value::Float(0.0)]);
    }

    #[test]
    fn test_duplicate_columns_across_int_and_float() {
        let mut p = processor(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("b", vec![Value::Float(1.0), Value::Float(2.0)]),
            ("c", vec![Value::Float(1.0), Value::Float(2.5)]),
        ]);
        assert_eq!(
            p.duplicate_columns(),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        p.resolve_duplicate_columns(Keep::First);
        assert_eq!(p.table().headers(), &["a", "c"]);
    }

    #[test]
    fn test_resolve_duplicate_columns_without_duplicates_records_nothing() {
        let mut p = letters();
        p.resolve_duplicate_columns(Keep::First);
        assert_eq!(p.table().headers(), &["k", "v"]);
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_resolve_duplicate_columns_last_and_none() {
        let columns = || {
            vec![
                ("a", vec![Value::Int(1)]),
                ("b", vec![Value::Int(1)]),
                ("c", vec!["x".into()]),
            ]
        };
        let mut p = processor(columns());
        p.resolve_duplicate_columns(Keep::Last);
        assert_eq!(p.table().headers(), &["b", "c"]);

        let mut p = processor(columns());
        p.resolve_duplicate_columns(Keep::None);
        assert_eq!(p.table().headers(), &["c"]);
    }
}
