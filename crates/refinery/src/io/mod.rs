//! Load and save boundaries.
//!
//! [`TableLoader`] turns a file into a [`DataTable`]; [`TableWriter`]
//! persists one. The default implementations dispatch on file extension:
//! delimited text through the `csv` crate, spreadsheets through `calamine`
//! (read) and `rust_xlsxwriter` (write), and JSON record arrays through
//! `serde_json`.

mod csv;
mod excel;
mod json;
mod source;

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RefineryError, Result};
use crate::table::parse::{DEFAULT_NULL_TOKENS, convert_text, infer_text_column};
use crate::table::{ColumnType, DataTable, Value};

pub use source::{SourceMetadata, content_hash};

/// Delimited-text parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Raw string cells straight from a text parser.
#[derive(Debug, Clone)]
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Input formats recognized by [`FileLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.csv` / `.txt`: delimiter detected from content.
    Delimited,
    /// `.tsv`: tab-separated.
    Tsv,
    /// `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods`: first sheet.
    Spreadsheet,
    /// `.json`: array of records.
    Json,
}

impl FileFormat {
    /// Pick a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(FileFormat::Delimited),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileFormat::Spreadsheet),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }
}

/// Output formats for saved tables and row logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    #[default]
    Csv,
    Xlsx,
}

impl SaveFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Csv => "csv",
            SaveFormat::Xlsx => "xlsx",
        }
    }

    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .parse()
    }
}

impl FromStr for SaveFormat {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SaveFormat::Csv),
            "xlsx" => Ok(SaveFormat::Xlsx),
            _ => Err(RefineryError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Produces an in-memory table from a file.
pub trait TableLoader {
    fn load(&self, path: &Path) -> Result<(DataTable, SourceMetadata)>;
}

/// Persists a table.
pub trait TableWriter {
    /// Write `table` to `path`. With `with_index`, a named index is written
    /// as the first column; the ordinal index is never written.
    fn write(&self, table: &DataTable, path: &Path, format: SaveFormat, with_index: bool)
    -> Result<()>;
}

/// Default loader: dispatches on file extension.
#[derive(Debug, Clone)]
pub struct FileLoader {
    parser: ParserConfig,
    null_tokens: Vec<String>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self {
            parser: ParserConfig::default(),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Use a custom delimited-text configuration.
    pub fn with_parser_config(mut self, config: ParserConfig) -> Self {
        self.parser = config;
        self
    }

    /// Replace the set of strings read as missing.
    pub fn with_null_tokens(mut self, tokens: Vec<String>) -> Self {
        self.null_tokens = tokens;
        self
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<(DataTable, SourceMetadata)> {
        let format = FileFormat::from_path(path).ok_or_else(|| {
            RefineryError::unreadable(
                path,
                "unsupported file format (supported: .csv, .tsv, .txt, .xlsx, .xls, .ods, .json)",
            )
        })?;

        let contents = fs::read(path).map_err(|e| RefineryError::unreadable(path, e))?;

        let (table, format_name) = match format {
            FileFormat::Delimited | FileFormat::Tsv => {
                let mut config = self.parser.clone();
                if format == FileFormat::Tsv {
                    config.delimiter = Some(b'\t');
                }
                let (raw, delimiter) = csv::read_delimited(&contents, &config)
                    .map_err(|e| RefineryError::unreadable(path, e))?;
                let table = table_from_text(raw, &self.null_tokens)
                    .map_err(|e| RefineryError::unreadable(path, e))?;
                (table, csv::delimiter_format(delimiter).to_string())
            }
            FileFormat::Spreadsheet => {
                let (headers, rows) = excel::read_first_sheet(path, &self.null_tokens)?;
                let table = table_from_values(headers, rows, &self.null_tokens)
                    .map_err(|e| RefineryError::unreadable(path, e))?;
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("xlsx")
                    .to_ascii_lowercase();
                (table, ext)
            }
            FileFormat::Json => {
                let (headers, rows) = json::read_records(&contents, &self.null_tokens)
                    .map_err(|reason| RefineryError::unreadable(path, reason))?;
                let table = table_from_values(headers, rows, &self.null_tokens)
                    .map_err(|e| RefineryError::unreadable(path, e))?;
                (table, "json".to_string())
            }
        };

        if table.column_count() == 0 {
            return Err(RefineryError::unreadable(path, "no columns found"));
        }

        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            format = %format_name,
            "loaded table"
        );

        let metadata = SourceMetadata::new(
            path,
            &contents,
            format_name,
            table.row_count(),
            table.column_count(),
        );
        Ok((table, metadata))
    }
}

/// Default writer: CSV via the `csv` crate, XLSX via `rust_xlsxwriter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl TableWriter for FileWriter {
    fn write(
        &self,
        table: &DataTable,
        path: &Path,
        format: SaveFormat,
        with_index: bool,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RefineryError::io(parent, e))?;
        }

        match format {
            SaveFormat::Csv => {
                let file = File::create(path).map_err(|e| RefineryError::io(path, e))?;
                csv::write_csv(table, BufWriter::new(file), with_index)
            }
            SaveFormat::Xlsx => excel::write_xlsx(table, path, with_index),
        }
    }
}

/// Text form of a cell in written files. Whole floats keep a trailing
/// `.0` so they read back as floats.
pub(crate) fn format_cell(value: &Value) -> String {
    match value {
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
        other => other.to_string(),
    }
}

/// Make headers unique: blanks become `Unnamed: <i>`, repeats get a
/// `.1`, `.2`, ... suffix.
pub(crate) fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(headers.len());

    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        result.push(name);
    }

    result
}

/// Build a typed table from raw strings, inferring one type per column.
pub(crate) fn table_from_text<S: AsRef<str>>(raw: RawTable, null_tokens: &[S]) -> Result<DataTable> {
    let headers = dedupe_headers(raw.headers);
    let types: Vec<ColumnType> = (0..headers.len())
        .map(|c| infer_text_column(raw.rows.iter().map(|r| r[c].as_str()), null_tokens))
        .collect();

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&types)
                .map(|(cell, &t)| convert_text(cell, t, null_tokens))
                .collect()
        })
        .collect();

    DataTable::new(headers, rows)
}

/// Build a table from natively typed cells.
///
/// Columns holding only text go through the same inference as delimited
/// files; columns holding only whole floats become integers.
pub(crate) fn table_from_values<S: AsRef<str>>(
    headers: Vec<String>,
    mut rows: Vec<Vec<Value>>,
    null_tokens: &[S],
) -> Result<DataTable> {
    let headers = dedupe_headers(headers);

    for col in 0..headers.len() {
        let non_null = || rows.iter().map(|r| &r[col]).filter(|v| !v.is_null());

        if non_null().next().is_none() {
            continue;
        }

        if non_null().all(|v| matches!(v, Value::Text(_))) {
            let texts: Vec<&str> = non_null()
                .filter_map(|v| match v {
                    Value::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            let t = infer_text_column(texts, null_tokens);
            for row in rows.iter_mut() {
                if let Value::Text(s) = &row[col] {
                    row[col] = convert_text(s, t, null_tokens);
                }
            }
        } else if non_null().all(|v| match v {
            Value::Float(f) => f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15,
            Value::Int(_) => true,
            _ => false,
        }) {
            for row in rows.iter_mut() {
                if let Value::Float(f) = row[col] {
                    row[col] = Value::Int(f as i64);
                }
            }
        }
    }

    DataTable::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_format_from_str() {
        assert_eq!("csv".parse::<SaveFormat>().unwrap(), SaveFormat::Csv);
        assert_eq!("XLSX".parse::<SaveFormat>().unwrap(), SaveFormat::Xlsx);
        assert!(matches!(
            "parquet".parse::<SaveFormat>(),
            Err(RefineryError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/b.CSV")),
            Some(FileFormat::Delimited)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("b.xls")),
            Some(FileFormat::Spreadsheet)
        );
        assert_eq!(FileFormat::from_path(Path::new("b.parquet")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_dedupe_headers() {
        let headers = vec!["a".into(), "a".into(), "".into(), "a".into()];
        assert_eq!(
            dedupe_headers(headers),
            vec!["a", "a.1", "Unnamed: 2", "a.2"]
        );
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Value::Float(2.0)), "2.0");
        assert_eq!(format_cell(&Value::Float(2.5)), "2.5");
        assert_eq!(format_cell(&Value::Int(2)), "2");
        assert_eq!(format_cell(&Value::Null), "");
    }

    #[test]
    fn test_table_from_text_infers_types() {
        let raw = RawTable {
            headers: vec!["n".into(), "d".into()],
            rows: vec![
                vec!["1".into(), "2024-01-01".into()],
                vec!["NA".into(), "2024-01-02".into()],
            ],
        };
        let table = table_from_text(raw, DEFAULT_NULL_TOKENS).unwrap();
        assert_eq!(table.column_type(0), ColumnType::Integer);
        assert_eq!(table.column_type(1), ColumnType::Date);
        assert_eq!(table.get(1, 0), Some(&Value::Null));
    }

    #[test]
    fn test_table_from_values_whole_floats() {
        let rows = vec![
            vec![Value::Float(1.0), Value::from("2024-01-01")],
            vec![Value::Float(3.0), Value::Null],
        ];
        let table = table_from_values(vec!["n".into(), "d".into()], rows, DEFAULT_NULL_TOKENS)
            .unwrap();
        assert_eq!(table.column_type(0), ColumnType::Integer);
        assert_eq!(table.column_type(1), ColumnType::Date);
    }
}
