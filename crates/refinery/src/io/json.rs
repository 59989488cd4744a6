//! JSON reading: an array of records, one object per row.

use indexmap::IndexSet;
use serde_json::Value as JsonValue;

use crate::table::Value;
use crate::table::parse::is_null_token;

/// Parse a JSON array of objects.
///
/// Columns appear in first-seen key order; keys missing from a record are
/// nulls. Nested arrays and objects are kept as their JSON text.
pub(crate) fn read_records<S: AsRef<str>>(
    bytes: &[u8],
    null_tokens: &[S],
) -> std::result::Result<(Vec<String>, Vec<Vec<Value>>), String> {
    let parsed: JsonValue = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let JsonValue::Array(records) = parsed else {
        return Err("expected a JSON array of records".to_string());
    };

    let mut columns: IndexSet<String> = IndexSet::new();
    for record in &records {
        let JsonValue::Object(map) = record else {
            return Err("every record must be a JSON object".to_string());
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.insert(key.clone());
            }
        }
    }

    let headers: Vec<String> = columns.into_iter().collect();
    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| {
                    record
                        .get(h)
                        .map(|v| json_to_value(v, null_tokens))
                        .unwrap_or(Value::Null)
                })
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn json_to_value<S: AsRef<str>>(value: &JsonValue, null_tokens: &[S]) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        JsonValue::String(s) if is_null_token(s, null_tokens) => Value::Null,
        JsonValue::String(s) => Value::Text(s.clone()),
        nested => Value::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NULLS: &[&str] = &["", "na"];

    #[test]
    fn test_read_records_union_of_keys() {
        let json = br#"[{"a": 1, "b": "x"}, {"b": null, "c": 2.5}]"#;
        let (headers, rows) = read_records(json, NULLS).unwrap();
        assert_eq!(headers, vec!["a", "b", "c"]);
        assert_eq!(rows[0], vec![Value::Int(1), Value::from("x"), Value::Null]);
        assert_eq!(rows[1], vec![Value::Null, Value::Null, Value::Float(2.5)]);
    }

    #[test]
    fn test_read_records_rejects_non_array() {
        assert!(read_records(br#"{"a": 1}"#, NULLS).is_err());
        assert!(read_records(br#"[1, 2]"#, NULLS).is_err());
        assert!(read_records(b"not json", NULLS).is_err());
    }
}
