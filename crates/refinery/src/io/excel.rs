//! Spreadsheet reading (calamine) and xlsx writing (rust_xlsxwriter).

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet};

use crate::error::{RefineryError, Result};
use crate::table::parse::{is_null_token, parse_temporal};
use crate::table::{DataTable, Value};

/// Read the first worksheet of a workbook.
///
/// The first row holds the headers. Cells keep their native spreadsheet
/// type; text cells matching a null token become nulls.
pub(crate) fn read_first_sheet<S: AsRef<str>>(
    path: &Path,
    null_tokens: &[S],
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| RefineryError::unreadable(path, e))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(RefineryError::unreadable(path, "workbook has no sheets"));
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| RefineryError::unreadable(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .map(|cell| match data_to_value(cell, null_tokens) {
                Value::Null => String::new(),
                v => v.to_string(),
            })
            .collect(),
        None => return Ok((Vec::new(), Vec::new())),
    };

    let width = headers.len();
    let body = rows
        .map(|row| {
            let mut values: Vec<Value> = row
                .iter()
                .take(width)
                .map(|cell| data_to_value(cell, null_tokens))
                .collect();
            values.resize(width, Value::Null);
            values
        })
        .collect();

    Ok((headers, body))
}

/// Convert a spreadsheet cell to a value.
fn data_to_value<S: AsRef<str>>(cell: &Data, null_tokens: &[S]) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if is_null_token(s, null_tokens) => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => excel_serial_to_value(d.as_f64()),
        Data::DateTimeIso(s) => parse_temporal(s).unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Convert an Excel serial date to a date (whole days) or date-time.
fn excel_serial_to_value(serial: f64) -> Value {
    // Excel epoch is 1899-12-30 (with the 1900 leap year bug)
    let Some(base) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return Value::Float(serial);
    };
    if serial.fract() == 0.0 {
        return base
            .checked_add_signed(Duration::days(serial as i64))
            .map(Value::Date)
            .unwrap_or(Value::Float(serial));
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    base.and_time(chrono::NaiveTime::MIN)
        .checked_add_signed(Duration::milliseconds(millis))
        .map(Value::DateTime)
        .unwrap_or(Value::Float(serial))
}

/// Write a table to a single-sheet xlsx workbook.
pub(crate) fn write_xlsx(table: &DataTable, path: &Path, with_index: bool) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let index_name = table.index().name().filter(|_| with_index);
    let offset = usize::from(index_name.is_some());

    if let Some(name) = index_name {
        worksheet.write_string(0, 0, name)?;
    }
    for (c, header) in table.headers().iter().enumerate() {
        worksheet.write_string(0, col_num(c + offset)?, header)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let excel_row = row_num(r + 1)?;
        if index_name.is_some() {
            if let Some(label) = table.index().labels().get(r) {
                write_value(worksheet, excel_row, 0, label)?;
            }
        }
        for (c, value) in row.iter().enumerate() {
            write_value(worksheet, excel_row, col_num(c + offset)?, value)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_value(worksheet: &mut Worksheet, row: RowNum, col: ColNum, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Int(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) if f.is_finite() => {
            worksheet.write_number(row, col, *f)?;
        }
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        other => {
            worksheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

fn row_num(row: usize) -> Result<RowNum> {
    RowNum::try_from(row)
        .map_err(|_| RefineryError::InvalidArgument(format!("row {} exceeds sheet limits", row)))
}

fn col_num(col: usize) -> Result<ColNum> {
    ColNum::try_from(col).map_err(|_| {
        RefineryError::InvalidArgument(format!("column {} exceeds sheet limits", col))
    })
}
