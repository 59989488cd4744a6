//! Property-based tests for the cleaning operations.
//!
//! Property-based tests verify:
//! 1. **No panics**: operations never crash on any table
//! 2. **Invariants**: detect-then-remove, retention and drop rules always hold
//!
//! ```bash
//! PROPTEST_CASES=10000 cargo test -p refinery --test property_tests
//! ```

use std::collections::HashSet;

use proptest::prelude::*;

use refinery::{
    ColumnList, DataTable, DuplicateMethod, ImputeStrategy, Keep, TableProcessor, Value,
};

// =============================================================================
// Test Strategies
// =============================================================================

/// A numeric cell, occasionally null.
fn numeric_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => (-1000i64..1000).prop_map(Value::Int),
        1 => Just(Value::Null),
    ]
}

/// A small categorical cell, so duplicates are common.
fn category_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::from("a")),
        Just(Value::from("b")),
        Just(Value::from("c")),
        Just(Value::Null),
    ]
}

/// A table with two numeric columns and one categorical column.
fn mixed_table() -> impl Strategy<Value = DataTable> {
    (1usize..40).prop_flat_map(|rows| {
        (
            prop::collection::vec(numeric_cell(), rows),
            prop::collection::vec(numeric_cell(), rows),
            prop::collection::vec(category_cell(), rows),
        )
            .prop_map(|(x, y, c)| {
                DataTable::from_columns(vec![("x", x), ("y", y), ("c", c)])
                    .expect("columns have equal length")
            })
    })
}

fn session(table: DataTable) -> TableProcessor {
    TableProcessor::from_table(table).expect("in-memory source")
}

// =============================================================================
// Outliers
// =============================================================================

proptest! {
    #[test]
    fn remove_zscore_removes_exactly_the_flagged_rows(
        table in mixed_table(),
        threshold in 0.5f64..4.0,
    ) {
        let mut p = session(table);
        let flagged = p.outlier_rows(threshold);
        let before = p.table().row_count();

        p.remove_outliers_zscore(threshold);

        prop_assert_eq!(p.table().row_count(), before - flagged.row_count());
        let remaining: HashSet<&Value> = p.table().index().labels().iter().collect();
        for label in flagged.index().labels() {
            prop_assert!(!remaining.contains(label));
        }
    }

    #[test]
    fn infinite_threshold_never_removes(table in mixed_table()) {
        let mut p = session(table);
        let before = p.table().row_count();
        p.remove_outliers_zscore(f64::INFINITY);
        prop_assert_eq!(p.table().row_count(), before);
    }

    #[test]
    fn iqr_removal_keeps_values_within_fences(
        table in mixed_table(),
        multiplier in 0.0f64..3.0,
    ) {
        let mut p = session(table);
        let report = p.check_outliers_iqr(multiplier);
        let fences = &report.columns["x"];
        p.remove_outliers_iqr("x", multiplier).unwrap();

        if let (Some(lower), Some(upper)) = (fences.lower, fences.upper) {
            for value in p.table().column("x").unwrap() {
                if let Some(x) = value.as_f64() {
                    prop_assert!(x >= lower && x <= upper);
                }
            }
        }
    }
}

// =============================================================================
// Duplicates
// =============================================================================

proptest! {
    #[test]
    fn keep_first_leaves_no_duplicates(table in mixed_table()) {
        let mut p = session(table);
        let unique_before = p
            .table()
            .rows()
            .iter()
            .collect::<HashSet<_>>()
            .len();

        p.resolve_duplicates(DuplicateMethod::KeepFirst).unwrap();

        prop_assert_eq!(p.duplicate_report(None, Keep::None).unwrap().count, 0);
        prop_assert_eq!(p.table().row_count(), unique_before);
    }

    #[test]
    fn drop_all_and_keep_first_agree_on_singletons(table in mixed_table()) {
        let mut all = session(table.clone());
        let mut first = session(table);

        all.resolve_duplicates(DuplicateMethod::DropAll).unwrap();
        first.resolve_duplicates(DuplicateMethod::KeepFirst).unwrap();

        prop_assert!(all.table().row_count() <= first.table().row_count());
        let kept: HashSet<&Vec<Value>> = first.table().rows().iter().collect();
        for row in all.table().rows() {
            prop_assert!(kept.contains(row));
        }
    }

    #[test]
    fn flag_never_removes_rows(table in mixed_table()) {
        let mut p = session(table);
        let before = p.table().row_count();
        let expected = p.duplicate_report(None, Keep::First).unwrap().count;

        p.resolve_duplicates(DuplicateMethod::Flag).unwrap();

        prop_assert_eq!(p.table().row_count(), before);
        let flagged = p
            .table()
            .column("is_duplicate")
            .unwrap()
            .into_iter()
            .filter(|v| **v == Value::Bool(true))
            .count();
        prop_assert_eq!(flagged, expected);
    }
}

// =============================================================================
// Columns and missing values
// =============================================================================

proptest! {
    #[test]
    fn drop_columns_only_drops_existing(
        table in mixed_table(),
        names in prop::collection::vec(prop_oneof![
            Just("x".to_string()),
            Just("c".to_string()),
            "[d-w]{1,4}",
        ], 0..5),
    ) {
        let mut p = session(table);
        let requested: HashSet<&str> = names.iter().map(String::as_str).collect();
        let expected: Vec<String> = p
            .table()
            .headers()
            .iter()
            .filter(|h| !requested.contains(h.as_str()))
            .cloned()
            .collect();

        p.drop_columns(ColumnList::from(names.clone()));

        prop_assert_eq!(p.table().headers(), expected.as_slice());
    }

    #[test]
    fn imputation_fills_every_fillable_column(table in mixed_table()) {
        for strategy in [ImputeStrategy::Mean, ImputeStrategy::Median, ImputeStrategy::MostFrequent] {
            let mut p = session(table.clone());
            let report = p.handle_missing_with_report(strategy, &[]).unwrap();

            for (col, name) in p.table().headers().iter().enumerate() {
                let nulls = p.table().column_values(col).filter(|v| v.is_null()).count();
                if report.unfillable.contains(name) {
                    prop_assert_eq!(nulls, p.table().row_count());
                } else {
                    prop_assert_eq!(nulls, 0);
                }
            }
        }
    }

    #[test]
    fn drop_strategy_leaves_no_nulls(table in mixed_table()) {
        let mut p = session(table);
        let with_nulls = p.missing_rows().row_count();
        let before = p.table().row_count();

        p.handle_missing(ImputeStrategy::Drop, &[]).unwrap();

        prop_assert_eq!(p.missing_report().total, 0);
        prop_assert_eq!(p.table().row_count(), before - with_nulls);
    }

    #[test]
    fn normalized_values_are_in_unit_interval(table in mixed_table()) {
        let mut p = session(table);
        p.normalize_columns(None).unwrap();
        for name in ["x", "y"] {
            for value in p.table().column(name).unwrap() {
                if let Some(x) = value.as_f64() {
                    prop_assert!((0.0..=1.0).contains(&x));
                }
            }
        }
    }

    #[test]
    fn run_all_checks_is_read_only(table in mixed_table()) {
        let p = session(table.clone());
        let _ = p.run_all_checks().unwrap();
        prop_assert_eq!(p.table(), &table);
        prop_assert!(p.history().is_empty());
    }
}
