//! Min-max scaling of numeric columns.

use crate::audit::TransformChange;
use crate::error::Result;
use crate::stats::StreamingStats;
use crate::table::{ColumnList, Value};

use super::TableProcessor;

impl TableProcessor {
    /// Scale numeric columns to `[0, 1]`.
    ///
    /// With `None` every numeric column is scaled. Named columns must exist
    /// and be numeric. Constant columns become `0.0`; nulls stay null.
    pub fn normalize_columns(&mut self, columns: Option<ColumnList>) -> Result<&mut Self> {
        let targets = match &columns {
            Some(list) if !list.is_empty() => list
                .iter()
                .map(|name| self.numeric_column(name))
                .collect::<Result<Vec<usize>>>()?,
            _ => self.numeric_columns(),
        };

        let mut changed = 0;
        let mut names = Vec::with_capacity(targets.len());
        for col in targets {
            let summary: StreamingStats = self
                .table
                .numeric_values(col)
                .into_iter()
                .map(|(_, x)| x)
                .collect();
            let (Some(min), Some(max)) = (summary.min(), summary.max()) else {
                continue;
            };
            let range = max - min;
            changed += self.table.map_column(col, |v| match v.as_f64() {
                Some(_) if range == 0.0 => Value::Float(0.0),
                Some(x) => Value::Float((x - min) / range),
                None => v.clone(),
            });
            names.push(self.table.headers()[col].clone());
        }

        self.commit(
            TransformChange::new(
                "normalize_columns",
                format!("Min-max scaled {} column(s)", names.len()),
            )
            .with_columns(names)
            .with_values_changed(changed),
        );
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::processor;
    use crate::error::RefineryError;
    use crate::table::{ColumnType, Value};

    #[test]
    fn test_normalize_all_numeric_columns() {
        let mut p = processor(vec![
            ("a", vec![Value::Int(0), Value::Int(5), Value::Null, Value::Int(10)]),
            ("b", vec![Value::Float(3.0); 4]),
            ("name", vec!["w".into(), "x".into(), "y".into(), "z".into()]),
        ]);
        p.normalize_columns(None).unwrap();

        assert_eq!(
            p.table().column("a").unwrap(),
            vec![
                &Value::Float(0.0),
                &Value::Float(0.5),
                &Value::Null,
                &Value::Float(1.0)
            ]
        );
        assert_eq!(p.table().column("b").unwrap(), vec![&Value::Float(0.0); 4]);
        assert_eq!(p.table().column_type(2), ColumnType::String);
        assert_eq!(p.history().changes()[0].columns, vec!["a", "b"]);
    }

    #[test]
    fn test_normalize_named_columns_validated_first() {
        let mut p = processor(vec![
            ("a", vec![Value::Int(1), Value::Int(3)]),
            ("name", vec!["x".into(), "y".into()]),
        ]);
        let err = p.normalize_columns(Some(["a", "name"].into())).unwrap_err();
        assert!(matches!(err, RefineryError::NotNumericColumn(_)));
        assert_eq!(p.table().get(0, 0), Some(&Value::Int(1)));

        let err = p.normalize_columns(Some("missing".into())).unwrap_err();
        assert!(matches!(err, RefineryError::UnknownColumn(_)));
        assert!(p.history().is_empty());

        p.normalize_columns(Some("a".into())).unwrap();
        assert_eq!(p.table().get(1, 0), Some(&Value::Float(1.0)));
    }
}
