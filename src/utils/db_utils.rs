use crate::error::AppError;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// SQL bindable value enum
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// SQL update container
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Build a dynamic UPDATE from a partial JSON payload.
///
/// `allowed` maps camelCase wire keys to their columns; only mapped keys
/// make it into the SET clause, so column names never come from the
/// caller.
pub fn build_update_sql(
    table: &str,
    allowed: &[(&str, &str)],
    payload: &Value,
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::invalid_input("payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::invalid_input("no fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    for key in obj.keys() {
        match allowed.iter().find(|(wire, _)| *wire == key.as_str()) {
            Some((_, column)) => columns.push(*column),
            None => return Err(AppError::InvalidInput(format!("unknown field '{key}'"))),
        }
    }

    let set_clause = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values -> SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(AppError::invalid_input("unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlUpdate { sql, values })
}

/// Execute the update
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[(&str, &str)] = &[
        ("firstName", "first_name"),
        ("hireDate", "hire_date"),
        ("isActive", "is_active"),
    ];

    #[test]
    fn camel_case_keys_map_to_columns() {
        let update = build_update_sql(
            "users",
            ALLOWED,
            &json!({"firstName": "Jane"}),
            "id",
            7,
        )
        .unwrap();
        assert_eq!(update.sql, "UPDATE users SET first_name = ? WHERE id = ?");
        assert_eq!(update.values.len(), 2);
    }

    #[test]
    fn rejects_unknown_and_raw_column_keys() {
        let err = build_update_sql(
            "users",
            ALLOWED,
            &json!({"role_id": 1}),
            "id",
            7,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        // the wire is camelCase; raw column names are not accepted either
        assert!(build_update_sql("users", ALLOWED, &json!({"first_name": "x"}), "id", 7).is_err());
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("users", ALLOWED, &json!({}), "id", 7).is_err());
        assert!(build_update_sql("users", ALLOWED, &json!([1, 2]), "id", 7).is_err());
    }

    #[test]
    fn date_strings_become_date_binds() {
        let update = build_update_sql(
            "users",
            ALLOWED,
            &json!({"hireDate": "2024-01-01"}),
            "id",
            7,
        )
        .unwrap();
        assert!(matches!(update.values[0], SqlValue::Date(_)));
    }
}
