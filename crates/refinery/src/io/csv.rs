//! Delimited text reading (with delimiter detection) and CSV writing.

use std::io::{BufRead, BufReader, Write};

use crate::error::Result;
use crate::table::DataTable;

use super::{ParserConfig, RawTable, format_cell};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parse delimited bytes into raw string cells.
///
/// Short rows are padded with empty cells and long rows truncated to the
/// header width.
pub(crate) fn read_delimited(bytes: &[u8], config: &ParserConfig) -> Result<(RawTable, u8)> {
    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(bytes),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .quote(config.quote)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();

    let headers: Vec<String> = if config.has_header {
        match records.next() {
            Some(record) => record?.iter().map(|s| s.trim().to_string()).collect(),
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (row_idx, result) in records.enumerate() {
        if let Some(max) = config.max_rows {
            if row_idx >= max {
                break;
            }
        }
        let record = result?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    // Generate column names when the file has no header row
    let headers = if config.has_header {
        headers
    } else {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        (0..width).map(|i| format!("column_{}", i + 1)).collect()
    };

    let expected_cols = headers.len();
    for row in &mut rows {
        row.resize(expected_cols, String::new());
    }

    Ok((RawTable { headers, rows }, delimiter))
}

/// Detect the delimiter by analyzing the first few lines.
pub(crate) fn detect_delimiter(bytes: &[u8]) -> u8 {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let Some(&first_count) = counts.first() else {
            continue;
        };
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance = counts
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / counts.len() as f64;

        // Higher count with lower variance wins; tabs get a small bonus
        // since they rarely occur inside values.
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    best_delimiter
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

/// Human-readable name of a delimiter, recorded in source metadata.
pub(crate) fn delimiter_format(delimiter: u8) -> &'static str {
    match delimiter {
        b'\t' => "tsv",
        b',' => "csv",
        b';' => "csv-semicolon",
        b'|' => "psv",
        _ => "delimited",
    }
}

/// Write a table as comma-separated text.
pub(crate) fn write_csv<W: Write>(table: &DataTable, out: W, with_index: bool) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    let index_name = table.index().name().filter(|_| with_index);

    let mut header: Vec<&str> = Vec::with_capacity(table.column_count() + 1);
    if let Some(name) = index_name {
        header.push(name);
    }
    header.extend(table.headers().iter().map(|h| h.as_str()));
    writer.write_record(&header)?;

    for (pos, row) in table.rows().iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(row.len() + 1);
        if index_name.is_some() {
            record.push(
                table
                    .index()
                    .labels()
                    .get(pos)
                    .map(format_cell)
                    .unwrap_or_default(),
            );
        }
        record.extend(row.iter().map(format_cell));
        writer.write_record(&record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Index, Value};

    #[test]
    fn test_detect_delimiter_csv() {
        assert_eq!(detect_delimiter(b"a,b,c\n1,2,3\n4,5,6"), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        assert_eq!(detect_delimiter(b"a\tb\tc\n1\t2\t3\n4\t5\t6"), b'\t');
    }

    #[test]
    fn test_detect_delimiter_respects_quotes() {
        assert_eq!(detect_delimiter(b"a;b\n\"x,y\";2\n\"z,w\";3"), b';');
    }

    #[test]
    fn test_read_delimited_pads_short_rows() {
        let (raw, delim) =
            read_delimited(b"name,age,city\nAlice,30\nBob,25,LA", &ParserConfig::default())
                .unwrap();
        assert_eq!(delim, b',');
        assert_eq!(raw.headers, vec!["name", "age", "city"]);
        assert_eq!(raw.rows[0], vec!["Alice", "30", ""]);
        assert_eq!(raw.rows[1][2], "LA");
    }

    #[test]
    fn test_read_delimited_without_header() {
        let config = ParserConfig {
            has_header: false,
            ..ParserConfig::default()
        };
        let (raw, _) = read_delimited(b"1,2\n3,4", &config).unwrap();
        assert_eq!(raw.headers, vec!["column_1", "column_2"]);
        assert_eq!(raw.rows.len(), 2);
    }

    #[test]
    fn test_write_csv_named_index() {
        let mut table =
            DataTable::from_columns(vec![("v", vec![Value::Float(2.0), Value::Null])]).unwrap();
        table
            .set_index(Index::named("day", vec!["a".into(), "b".into()]))
            .unwrap();

        let mut out = Vec::new();
        write_csv(&table, &mut out, true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "day,v\na,2.0\nb,\n");

        let mut out = Vec::new();
        write_csv(&table, &mut out, false).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("v\n2.0\n"));
    }
}
