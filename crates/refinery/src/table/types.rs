//! Column type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fine-grained data type of a column, derived from its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers.
    Integer,
    /// Floating-point numbers.
    Float,
    /// Boolean values (true/false).
    Boolean,
    /// Text values, or a mix of value types.
    String,
    /// Calendar dates (no time component).
    Date,
    /// Date and time values.
    DateTime,
    /// No non-null values to judge from.
    Unknown,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    ///
    /// A column with no observed values counts as numeric, the same way an
    /// all-missing column loads as a float column.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Float | ColumnType::Unknown
        )
    }

    /// Returns true if this type is temporal.
    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Date)
    }

    /// Coarse kind used by inspection and the numeric-only operations.
    pub fn kind(&self) -> ColumnKind {
        if self.is_numeric() {
            ColumnKind::Numeric
        } else if self.is_temporal() {
            ColumnKind::Datetime
        } else {
            ColumnKind::Categorical
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::Unknown
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Coarse column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    /// Anything that is neither numeric nor temporal.
    Categorical,
    Datetime,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Datetime => "datetime",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ColumnType::Integer.kind(), ColumnKind::Numeric);
        assert_eq!(ColumnType::Float.kind(), ColumnKind::Numeric);
        assert_eq!(ColumnType::Unknown.kind(), ColumnKind::Numeric);
        assert_eq!(ColumnType::Date.kind(), ColumnKind::Datetime);
        assert_eq!(ColumnType::DateTime.kind(), ColumnKind::Datetime);
        assert_eq!(ColumnType::String.kind(), ColumnKind::Categorical);
        assert_eq!(ColumnType::Boolean.kind(), ColumnKind::Categorical);
    }
}
