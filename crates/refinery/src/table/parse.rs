//! Text-to-value parsing: null detection, per-column type inference and
//! best-effort date/time coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ColumnType;
use super::value::Value;

/// Tokens treated as missing when reading text.
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "", "na", "n/a", "nan", "null", "none", "nil", ".", "-", "#n/a",
];

// Cheap shape checks run before any chrono format is attempted.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}",     // ISO / alt ISO
        r"^\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4}", // US / European
        r"^[A-Za-z]{3,9}\.? \d{1,2}, \d{4}", // Jan 5, 2024
        r"^\d{1,2} [A-Za-z]{3,9} \d{4}",     // 5 Jan 2024
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Check if a raw string is one of the given null tokens (case-insensitive,
/// surrounding whitespace ignored).
pub fn is_null_token<S: AsRef<str>>(value: &str, tokens: &[S]) -> bool {
    let trimmed = value.trim();
    tokens
        .iter()
        .any(|t| trimmed.eq_ignore_ascii_case(t.as_ref().trim()))
}

/// Check a raw string against [`DEFAULT_NULL_TOKENS`].
pub fn is_null_value(value: &str) -> bool {
    is_null_token(value, DEFAULT_NULL_TOKENS)
}

/// Parse a date or date-time string.
///
/// Returns `Value::Date` when the text carries no time of day and
/// `Value::DateTime` otherwise. Offsets are normalized to UTC.
pub fn parse_temporal(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if !DATE_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(Value::DateTime(dt.naive_utc()));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Value::DateTime(dt));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(Value::Date(d));
        }
    }

    None
}

/// Coerce a cell to a temporal value.
///
/// Temporal cells pass through, text is parsed, everything else (including
/// nulls and numbers) fails and yields `None`.
pub fn coerce_temporal(value: &Value) -> Option<Value> {
    match value {
        Value::Date(_) | Value::DateTime(_) => Some(value.clone()),
        Value::Text(s) => parse_temporal(s),
        _ => None,
    }
}

/// Detect the type of a single non-null raw value.
fn detect_value_type(trimmed: &str) -> ColumnType {
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }

    if trimmed.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }

    // Rust accepts "inf" and "nan" as floats; real numbers carry a digit.
    if trimmed.bytes().any(|b| b.is_ascii_digit()) && trimmed.parse::<f64>().is_ok() {
        return ColumnType::Float;
    }

    match parse_temporal(trimmed) {
        Some(Value::Date(_)) => ColumnType::Date,
        Some(_) => ColumnType::DateTime,
        None => ColumnType::String,
    }
}

/// Infer one type for a column of raw strings.
///
/// The column is numeric only if every non-null value is numeric (integers
/// promote to float when mixed), temporal only if every value parses as a
/// date, and text otherwise.
pub fn infer_text_column<'a, S: AsRef<str>>(
    values: impl IntoIterator<Item = &'a str>,
    null_tokens: &[S],
) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;

    for raw in values {
        if is_null_token(raw, null_tokens) {
            continue;
        }
        let detected = detect_value_type(raw.trim());
        inferred = Some(match (inferred, detected) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(ColumnType::Integer), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
            (Some(ColumnType::Date), ColumnType::DateTime)
            | (Some(ColumnType::DateTime), ColumnType::Date) => ColumnType::DateTime,
            _ => return ColumnType::String,
        });
    }

    inferred.unwrap_or(ColumnType::Unknown)
}

/// Convert a raw string to a value of the column's inferred type.
pub fn convert_text<S: AsRef<str>>(raw: &str, column_type: ColumnType, null_tokens: &[S]) -> Value {
    if is_null_token(raw, null_tokens) {
        return Value::Null;
    }
    let trimmed = raw.trim();

    match column_type {
        ColumnType::Integer => trimmed.parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        ColumnType::Float => trimmed.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        ColumnType::Boolean => Value::Bool(trimmed.eq_ignore_ascii_case("true")),
        ColumnType::Date => parse_temporal(trimmed).unwrap_or(Value::Null),
        ColumnType::DateTime => match parse_temporal(trimmed) {
            Some(Value::Date(d)) => Value::DateTime(d.and_time(chrono::NaiveTime::MIN)),
            Some(v) => v,
            None => Value::Null,
        },
        ColumnType::String | ColumnType::Unknown => Value::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null_value() {
        assert!(is_null_value(""));
        assert!(is_null_value("NA"));
        assert!(is_null_value("na"));
        assert!(is_null_value("N/A"));
        assert!(is_null_value("null"));
        assert!(is_null_value("NaN"));
        assert!(is_null_value(" . "));
        assert!(!is_null_value("value"));
        assert!(!is_null_value("0"));
    }

    #[test]
    fn test_parse_temporal_formats() {
        assert_eq!(
            parse_temporal("2024-01-15"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        assert_eq!(
            parse_temporal("01/15/2024"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        assert_eq!(
            parse_temporal("Jan 15, 2024"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_temporal("2024-01-15 10:30:00"), Some(Value::DateTime(dt)));
        assert_eq!(parse_temporal("2024-01-15T10:30:00Z"), Some(Value::DateTime(dt)));
    }

    #[test]
    fn test_parse_temporal_rejects_garbage() {
        assert_eq!(parse_temporal("not-a-date"), None);
        assert_eq!(parse_temporal("2024-13-45"), None);
        assert_eq!(parse_temporal("12345"), None);
    }

    #[test]
    fn test_infer_text_column() {
        let nulls = DEFAULT_NULL_TOKENS;
        assert_eq!(infer_text_column(["1", "2", "NA"], nulls), ColumnType::Integer);
        assert_eq!(infer_text_column(["1", "2.5"], nulls), ColumnType::Float);
        assert_eq!(infer_text_column(["true", "False"], nulls), ColumnType::Boolean);
        assert_eq!(
            infer_text_column(["2024-01-01", "2024-02-01 12:00:00"], nulls),
            ColumnType::DateTime
        );
        assert_eq!(infer_text_column(["1", "x"], nulls), ColumnType::String);
        assert_eq!(infer_text_column(["inf", "nan"], nulls), ColumnType::String);
        assert_eq!(infer_text_column(["", "NA"], nulls), ColumnType::Unknown);
    }

    #[test]
    fn test_convert_text() {
        let nulls = DEFAULT_NULL_TOKENS;
        assert_eq!(convert_text("42", ColumnType::Integer, nulls), Value::Int(42));
        assert_eq!(convert_text("NA", ColumnType::Integer, nulls), Value::Null);
        assert_eq!(convert_text("2.5", ColumnType::Float, nulls), Value::Float(2.5));
        assert_eq!(convert_text("TRUE", ColumnType::Boolean, nulls), Value::Bool(true));
        assert_eq!(
            convert_text("hello", ColumnType::String, nulls),
            Value::Text("hello".to_string())
        );
    }
}
