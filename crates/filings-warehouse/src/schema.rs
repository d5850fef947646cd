//! Schema auto-detection for NDJSON records.
//!
//! Every key seen in any record becomes a column, in first-seen order. Column
//! types widen as values are observed: integers and reals make a REAL column,
//! anything textual makes a TEXT column, booleans are stored as integers and
//! nested arrays or objects as JSON text. A column that only ever held nulls
//! is TEXT.

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

/// SQLite storage class of a detected column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Whole numbers and booleans.
    Integer,
    /// Floating point, or a mix of integers and floats.
    Real,
    /// Strings, nested JSON, or mixed types.
    Text,
}

impl ColumnType {
    /// Type name used in DDL.
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// Type implied by one JSON value; `None` for null.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Integer),
            Value::Number(n) if n.is_f64() => Some(Self::Real),
            Value::Number(_) => Some(Self::Integer),
            Value::String(_) | Value::Array(_) | Value::Object(_) => Some(Self::Text),
        }
    }

    /// Narrowest type able to hold values of both types.
    #[must_use]
    pub const fn widen(self, other: Self) -> Self {
        match (self, other) {
            (Self::Text, _) | (_, Self::Text) => Self::Text,
            (Self::Real, _) | (_, Self::Real) => Self::Real,
            (Self::Integer, Self::Integer) => Self::Integer,
        }
    }
}

/// A detected column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name (the JSON key).
    pub name: String,
    /// Detected type.
    pub column_type: ColumnType,
}

/// Detects the columns of a batch of records.
#[must_use]
pub fn infer_schema(records: &[Map<String, Value>]) -> Vec<ColumnDef> {
    let mut columns: Vec<(String, Option<ColumnType>)> = Vec::new();

    for record in records {
        for (key, value) in record {
            let observed = ColumnType::of(value);
            match columns.iter_mut().find(|(name, _)| name == key) {
                Some((_, detected)) => {
                    *detected = match (*detected, observed) {
                        (Some(a), Some(b)) => Some(a.widen(b)),
                        (a, b) => a.or(b),
                    };
                }
                None => columns.push((key.clone(), observed)),
            }
        }
    }

    columns
        .into_iter()
        .map(|(name, detected)| ColumnDef {
            name,
            column_type: detected.unwrap_or(ColumnType::Text),
        })
        .collect()
}

/// Converts a JSON value into the SQLite value stored for it.
#[must_use]
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Quotes an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn column_type(schema: &[ColumnDef], name: &str) -> ColumnType {
        schema
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
            .unwrap()
    }

    #[test]
    fn test_types_widen_across_records() {
        let schema = infer_schema(&records(vec![
            json!({"cik": "0000320193", "val": 1000000, "fy": 2023, "accn": null, "flag": true}),
            json!({"cik": "0000320193", "val": 6.13, "fy": 2024, "accn": null, "flag": false, "extra": {"a": 1}}),
        ]));

        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cik", "val", "fy", "accn", "flag", "extra"]);
        assert_eq!(column_type(&schema, "cik"), ColumnType::Text);
        assert_eq!(column_type(&schema, "val"), ColumnType::Real);
        assert_eq!(column_type(&schema, "fy"), ColumnType::Integer);
        assert_eq!(column_type(&schema, "accn"), ColumnType::Text);
        assert_eq!(column_type(&schema, "flag"), ColumnType::Integer);
        assert_eq!(column_type(&schema, "extra"), ColumnType::Text);
    }

    #[test]
    fn test_null_then_value_takes_value_type() {
        let schema = infer_schema(&records(vec![json!({"fy": null}), json!({"fy": 2023})]));
        assert_eq!(column_type(&schema, "fy"), ColumnType::Integer);
    }

    #[test]
    fn test_sql_values() {
        assert_eq!(to_sql_value(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql_value(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql_value(&json!(42)), SqlValue::Integer(42));
        assert_eq!(to_sql_value(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(to_sql_value(&json!("x")), SqlValue::Text("x".to_string()));
        assert_eq!(to_sql_value(&json!([1])), SqlValue::Text("[1]".to_string()));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("sec_raw"), "\"sec_raw\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
