//! SQL statement building for tables whose shape is only known at runtime.
//!
//! Every statement selects through `row_to_json` so callers get rows back as
//! JSON objects, and every parameter is bound as text and cast to the
//! column's own type (`$1::"int4"`), which lets one binding path serve
//! arbitrary column types.
//!
//! JSON numbers decode as `f64`, so NUMERIC columns registered with
//! [`QueryBuilder::with_text_columns`] are projected as their text form.

use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::database::manager::{DatabaseError, DatabaseManager};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// One `column = value` pair with the column's SQL type
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub sql_type: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, sql_type: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            sql_type: sql_type.into(),
            value,
        }
    }
}

/// Key column used to address a single row
#[derive(Debug, Clone, PartialEq)]
pub struct RowKey {
    pub column: String,
    pub sql_type: String,
}

impl RowKey {
    pub fn new(column: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Column types whose values must leave the database as text
pub fn is_exact_numeric(udt_name: &str) -> bool {
    udt_name == "numeric"
}

pub struct QueryBuilder {
    table_name: String,
    text_columns: Vec<String>,
}

impl QueryBuilder {
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = table_name.into();
        if !DatabaseManager::is_valid_identifier(&name) {
            return Err(DatabaseError::InvalidIdentifier(name));
        }
        Ok(Self {
            table_name: name,
            text_columns: Vec::new(),
        })
    }

    /// Columns returned as JSON strings instead of JSON numbers
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns.extend(
            columns
                .into_iter()
                .map(Into::into)
                .filter(|c| DatabaseManager::is_valid_identifier(c)),
        );
        self
    }

    fn table(&self) -> String {
        DatabaseManager::quote_identifier(&self.table_name)
    }

    /// JSON object expression for one row of `source`
    fn projection(&self, source: &str) -> String {
        if self.text_columns.is_empty() {
            return format!("row_to_json({})", source);
        }
        let overrides: Vec<String> = self
            .text_columns
            .iter()
            .map(|c| format!("'{}', {}.{}::text", c, source, DatabaseManager::quote_identifier(c)))
            .collect();
        format!("to_jsonb({}) || jsonb_build_object({})", source, overrides.join(", "))
    }

    /// All rows ordered by `order_by`, optionally paged
    pub fn select_all(&self, order_by: Option<&str>, limit: Option<i64>, offset: Option<i64>) -> SqlResult {
        let mut inner = format!("SELECT * FROM {}", self.table());
        let mut params = Vec::new();

        if let Some(column) = order_by {
            inner += &format!(" ORDER BY {}", DatabaseManager::quote_identifier(column));
        }
        if let Some(limit) = limit {
            params.push(Value::from(limit));
            inner += &format!(" LIMIT ${}::int8", params.len());
        }
        if let Some(offset) = offset {
            params.push(Value::from(offset));
            inner += &format!(" OFFSET ${}::int8", params.len());
        }

        SqlResult {
            query: format!("SELECT {} AS row FROM ({}) t", self.projection("t"), inner),
            params,
        }
    }

    pub fn select_by_key(&self, key: &RowKey, value: Value) -> SqlResult {
        SqlResult {
            query: format!(
                "SELECT {} AS row FROM (SELECT * FROM {} WHERE {} = $1::{}) t",
                self.projection("t"),
                self.table(),
                DatabaseManager::quote_identifier(&key.column),
                DatabaseManager::quote_identifier(&key.sql_type),
            ),
            params: vec![value],
        }
    }

    pub fn insert(&self, assignments: &[Assignment]) -> SqlResult {
        let statement = if assignments.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", self.table())
        } else {
            let columns: Vec<String> = assignments
                .iter()
                .map(|a| DatabaseManager::quote_identifier(&a.column))
                .collect();
            let values: Vec<String> = assignments
                .iter()
                .enumerate()
                .map(|(i, a)| format!("${}::{}", i + 1, DatabaseManager::quote_identifier(&a.sql_type)))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                self.table(),
                columns.join(", "),
                values.join(", ")
            )
        };

        SqlResult {
            query: format!(
                "WITH stored AS ({}) SELECT {} AS row FROM stored",
                statement,
                self.projection("stored")
            ),
            params: assignments.iter().map(|a| a.value.clone()).collect(),
        }
    }

    /// Caller guarantees `assignments` is non-empty
    pub fn update(&self, assignments: &[Assignment], key: &RowKey, key_value: Value) -> SqlResult {
        let sets: Vec<String> = assignments
            .iter()
            .enumerate()
            .map(|(i, a)| {
                format!(
                    "{} = ${}::{}",
                    DatabaseManager::quote_identifier(&a.column),
                    i + 1,
                    DatabaseManager::quote_identifier(&a.sql_type)
                )
            })
            .collect();

        let mut params: Vec<Value> = assignments.iter().map(|a| a.value.clone()).collect();
        params.push(key_value);

        SqlResult {
            query: format!(
                "WITH stored AS (UPDATE {} SET {} WHERE {} = ${}::{} RETURNING *) SELECT {} AS row FROM stored",
                self.table(),
                sets.join(", "),
                DatabaseManager::quote_identifier(&key.column),
                params.len(),
                DatabaseManager::quote_identifier(&key.sql_type),
                self.projection("stored"),
            ),
            params,
        }
    }

    pub fn delete(&self, key: &RowKey, key_value: Value) -> SqlResult {
        SqlResult {
            query: format!(
                "DELETE FROM {} WHERE {} = $1::{}",
                self.table(),
                DatabaseManager::quote_identifier(&key.column),
                DatabaseManager::quote_identifier(&key.sql_type),
            ),
            params: vec![key_value],
        }
    }
}

impl SqlResult {
    fn bound(&self) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        let mut q = sqlx::query(&self.query);
        for p in self.params.iter() {
            q = q.bind(param_text(p));
        }
        q
    }

    pub async fn fetch_rows(&self, pool: &PgPool) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let rows = self.bound().fetch_all(pool).await?;
        rows.iter().map(json_row).collect()
    }

    pub async fn fetch_optional_row(&self, pool: &PgPool) -> Result<Option<Map<String, Value>>, DatabaseError> {
        match self.bound().fetch_optional(pool).await? {
            Some(row) => json_row(&row).map(Some),
            None => Ok(None),
        }
    }

    pub async fn execute(&self, pool: &PgPool) -> Result<u64, DatabaseError> {
        let result = self.bound().execute(pool).await?;
        Ok(result.rows_affected())
    }
}

/// Text form of a JSON parameter; the SQL side casts it to the column type
fn param_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // Numbers, booleans, arrays and objects keep their JSON spelling
        other => Some(other.to_string()),
    }
}

fn json_row(row: &PgRow) -> Result<Map<String, Value>, DatabaseError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("unexpected row format: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_invalid_table_names() {
        assert!(QueryBuilder::new("customers").is_ok());
        assert!(matches!(
            QueryBuilder::new("customers; DROP TABLE forms"),
            Err(DatabaseError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn builds_paged_select() {
        let sql = QueryBuilder::new("customers").unwrap().select_all(Some("id"), Some(10), Some(20));
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"customers\" ORDER BY \"id\" LIMIT $1::int8 OFFSET $2::int8) t"
        );
        assert_eq!(sql.params, vec![json!(10), json!(20)]);
    }

    #[test]
    fn builds_insert_with_casts() {
        let sql = QueryBuilder::new("customers").unwrap().insert(&[
            Assignment::new("name", "varchar", json!("Ada")),
            Assignment::new("age", "int4", json!(36)),
        ]);
        assert_eq!(
            sql.query,
            "WITH stored AS (INSERT INTO \"customers\" (\"name\", \"age\") VALUES ($1::\"varchar\", $2::\"int4\") RETURNING *) SELECT row_to_json(stored) AS row FROM stored"
        );
        assert_eq!(sql.params, vec![json!("Ada"), json!(36)]);
    }

    #[test]
    fn builds_default_values_insert() {
        let sql = QueryBuilder::new("audit").unwrap().insert(&[]);
        assert!(sql.query.contains("INSERT INTO \"audit\" DEFAULT VALUES RETURNING *"));
        assert!(sql.params.is_empty());
    }

    #[test]
    fn builds_update_with_key_last() {
        let sql = QueryBuilder::new("customers").unwrap().update(
            &[Assignment::new("name", "varchar", json!("Grace"))],
            &RowKey::new("id", "int8"),
            json!("7"),
        );
        assert!(sql
            .query
            .contains("UPDATE \"customers\" SET \"name\" = $1::\"varchar\" WHERE \"id\" = $2::\"int8\" RETURNING *"));
        assert_eq!(sql.params, vec![json!("Grace"), json!("7")]);
    }

    #[test]
    fn numeric_columns_are_projected_as_text() {
        let builder = QueryBuilder::new("products")
            .unwrap()
            .with_text_columns(["platform_fee", "bad name"]);

        let select = builder.select_all(Some("id"), None, None);
        assert_eq!(
            select.query,
            "SELECT to_jsonb(t) || jsonb_build_object('platform_fee', t.\"platform_fee\"::text) AS row FROM (SELECT * FROM \"products\" ORDER BY \"id\") t"
        );

        let insert = builder.insert(&[Assignment::new("platform_fee", "numeric", json!("99999999999999.99"))]);
        assert!(insert
            .query
            .ends_with("SELECT to_jsonb(stored) || jsonb_build_object('platform_fee', stored.\"platform_fee\"::text) AS row FROM stored"));
        assert_eq!(param_text(&insert.params[0]).as_deref(), Some("99999999999999.99"));
    }

    #[test]
    fn renders_params_as_text() {
        assert_eq!(param_text(&Value::Null), None);
        assert_eq!(param_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(param_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(param_text(&json!(12.5)).as_deref(), Some("12.5"));
        assert_eq!(param_text(&json!({"a": 1})).as_deref(), Some("{\"a\":1}"));
    }
}
