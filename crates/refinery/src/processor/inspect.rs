//! Read-only column inspection.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::table::{ColumnKind, ColumnType};

use super::TableProcessor;

impl TableProcessor {
    /// Kind of every column, in column order.
    pub fn dtype_summary(&self) -> IndexMap<String, ColumnKind> {
        self.column_types()
            .into_iter()
            .map(|(name, t)| (name, t.kind()))
            .collect()
    }

    /// Fine-grained type of every column, in column order.
    pub fn column_types(&self) -> IndexMap<String, ColumnType> {
        self.table
            .headers()
            .iter()
            .enumerate()
            .map(|(c, name)| (name.clone(), self.table.column_type(c)))
            .collect()
    }

    /// Categorical columns with their number of distinct non-null values.
    pub fn categorical_columns(&self) -> IndexMap<String, usize> {
        self.table
            .headers()
            .iter()
            .enumerate()
            .filter(|&(c, _)| self.table.column_type(c).kind() == ColumnKind::Categorical)
            .map(|(c, name)| {
                let distinct: HashSet<_> = self
                    .table
                    .column_values(c)
                    .filter(|v| !v.is_null())
                    .collect();
                (name.clone(), distinct.len())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::processor;
    use crate::table::{ColumnKind, ColumnType, Value};

    #[test]
    fn test_dtype_summary_order_and_kinds() {
        let p = processor(vec![
            ("city", vec!["a".into(), "b".into(), Value::Null]),
            ("n", vec![Value::Int(1), Value::Null, Value::Int(3)]),
            (
                "when",
                vec![
                    Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                    Value::Null,
                    Value::Null,
                ],
            ),
            ("empty", vec![Value::Null, Value::Null, Value::Null]),
        ]);

        let summary = p.dtype_summary();
        let names: Vec<&str> = summary.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["city", "n", "when", "empty"]);
        assert_eq!(summary["city"], ColumnKind::Categorical);
        assert_eq!(summary["n"], ColumnKind::Numeric);
        assert_eq!(summary["when"], ColumnKind::Datetime);
        assert_eq!(summary["empty"], ColumnKind::Numeric);

        assert_eq!(p.column_types()["n"], ColumnType::Integer);
    }

    #[test]
    fn test_categorical_columns_distinct_counts() {
        let p = processor(vec![
            ("city", vec!["a".into(), "b".into(), "a".into(), Value::Null]),
            ("n", vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]),
        ]);
        let cats = p.categorical_columns();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats["city"], 2);
    }
}
