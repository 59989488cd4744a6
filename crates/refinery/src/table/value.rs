//! Cell values.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::types::ColumnType;

/// A single table cell.
///
/// Equality and hashing are total and strict: floats compare by bit
/// pattern and an integer never equals a float. Duplicate detection
/// compares by value through [`Value::match_key`] instead.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, for integer and float cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Temporal view of the value. Dates are placed at midnight.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(d) => Some(d.and_time(chrono::NaiveTime::MIN)),
            _ => None,
        }
    }

    /// Type of this value, or `None` for a null.
    pub fn value_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Text(_) => Some(ColumnType::String),
            Value::Date(_) => Some(ColumnType::Date),
            Value::DateTime(_) => Some(ColumnType::DateTime),
        }
    }

    /// Hashable key that compares cells by value: integers and floats
    /// holding the same number match, `-0.0` matches `0.0`, every NaN
    /// matches every other NaN, and a date matches the date-time at its
    /// midnight.
    pub fn match_key(&self) -> MatchKey<'_> {
        match self {
            Value::Null => MatchKey::Null,
            Value::Bool(b) => MatchKey::Bool(*b),
            Value::Int(i) => MatchKey::Integral(*i),
            Value::Float(f) => float_key(*f),
            Value::Text(s) => MatchKey::Text(s),
            Value::Date(_) | Value::DateTime(_) => match self.as_datetime() {
                Some(dt) => MatchKey::Temporal(dt),
                None => MatchKey::Null,
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Date(_) | Value::DateTime(_) => 3,
            Value::Text(_) => 4,
        }
    }

    /// Total order over values: nulls first, then booleans, numbers,
    /// temporal values and text. Numbers compare numerically across the
    /// integer/float split.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    return a.total_cmp(&b);
                }
                if let (Some(a), Some(b)) = (self.as_datetime(), other.as_datetime()) {
                    return a.cmp(&b);
                }
                self.rank().cmp(&other.rank())
            }
        }
    }
}

/// Value-level identity of a cell, see [`Value::match_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKey<'a> {
    Null,
    Bool(bool),
    /// A whole number representable as `i64`.
    Integral(i64),
    /// Bit pattern of a canonical float.
    Fractional(u64),
    Text(&'a str),
    Temporal(NaiveDateTime),
}

// 2^63; integral floats in [-2^63, 2^63) convert to i64 exactly.
const I64_SPAN: f64 = 9_223_372_036_854_775_808.0;

fn float_key(f: f64) -> MatchKey<'static> {
    if f.is_nan() {
        return MatchKey::Fractional(f64::NAN.to_bits());
    }
    if f.fract() == 0.0 && (-I64_SPAN..I64_SPAN).contains(&f) {
        return MatchKey::Integral(f as i64);
    }
    MatchKey::Fractional(f.to_bits())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_match_key_compares_by_value() {
        assert_eq!(Value::Int(1).match_key(), Value::Float(1.0).match_key());
        assert_eq!(Value::Float(-0.0).match_key(), Value::Float(0.0).match_key());
        assert_eq!(
            Value::Float(f64::NAN).match_key(),
            Value::Float(-f64::NAN).match_key()
        );
        assert_ne!(Value::Int(1).match_key(), Value::Float(1.5).match_key());
        assert_ne!(Value::Int(1).match_key(), Value::from("1").match_key());
        assert_ne!(
            Value::Int(i64::MAX).match_key(),
            Value::Int(i64::MAX - 1).match_key()
        );

        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            Value::Date(d).match_key(),
            Value::DateTime(d.and_hms_opt(0, 0, 0).unwrap()).match_key()
        );
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(Value::from("a"));
        set.insert(Value::from("a"));
        set.insert(Value::Null);
        set.insert(Value::Null);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_total_cmp_mixed_numbers() {
        assert_eq!(Value::Int(2).total_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Null.total_cmp(&Value::Int(0)), Ordering::Less);
        assert_eq!(
            Value::from("b").total_cmp(&Value::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_display() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2024-03-01");
        let dt = d.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2024-03-01 08:30:00");
        assert_eq!(Value::Null.to_string(), "");
    }
}
