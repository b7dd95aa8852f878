//! Storage access for tables discovered at request time.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::table::TableColumn;
use crate::database::query_builder::{is_exact_numeric, Assignment, QueryBuilder, RowKey};

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Every base table of the current schema, sorted by name
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Columns in declaration order; empty when the table does not exist
    async fn describe(&self, table: &str) -> Result<Vec<TableColumn>, DatabaseError>;

    async fn select_rows(
        &self,
        table: &str,
        order_by: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError>;

    async fn insert_row(&self, table: &str, assignments: &[Assignment]) -> Result<Map<String, Value>, DatabaseError>;

    async fn update_row(
        &self,
        table: &str,
        assignments: &[Assignment],
        key: &RowKey,
        key_value: &str,
    ) -> Result<Option<Map<String, Value>>, DatabaseError>;
}

pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builder that keeps the table's NUMERIC columns exact
    async fn builder(&self, table: &str) -> Result<QueryBuilder, DatabaseError> {
        let builder = QueryBuilder::new(table)?;
        let columns = self.describe(table).await?;
        Ok(builder.with_text_columns(
            columns
                .into_iter()
                .filter(|c| is_exact_numeric(&c.udt_name))
                .map(|c| c.name),
        ))
    }
}

// information_schema columns are domain types; cast to text so they decode as String
const DESCRIBE_SQL: &str = r#"
SELECT
    c.column_name::text AS name,
    c.data_type::text AS data_type,
    c.udt_name::text AS udt_name,
    (c.is_nullable = 'YES') AS nullable,
    c.column_default::text AS default_value,
    COALESCE((
        SELECT CASE tc.constraint_type
                   WHEN 'PRIMARY KEY' THEN 'PRI'
                   WHEN 'UNIQUE' THEN 'UNI'
                   ELSE 'MUL'
               END
        FROM information_schema.key_column_usage k
        JOIN information_schema.table_constraints tc
          ON tc.constraint_name = k.constraint_name
         AND tc.table_schema = k.table_schema
         AND tc.table_name = k.table_name
        WHERE k.table_schema = c.table_schema
          AND k.table_name = c.table_name
          AND k.column_name = c.column_name
        ORDER BY CASE tc.constraint_type
                     WHEN 'PRIMARY KEY' THEN 0
                     WHEN 'UNIQUE' THEN 1
                     ELSE 2
                 END
        LIMIT 1
    ), '') AS column_key
FROM information_schema.columns c
WHERE c.table_schema = current_schema()
  AND c.table_name = $1
ORDER BY c.ordinal_position
"#;

#[async_trait]
impl TableStore for PgTableStore {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn describe(&self, table: &str) -> Result<Vec<TableColumn>, DatabaseError> {
        let columns = sqlx::query_as::<_, TableColumn>(DESCRIBE_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(columns)
    }

    async fn select_rows(
        &self,
        table: &str,
        order_by: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        self.builder(table)
            .await?
            .select_all(order_by, Some(limit), Some(offset))
            .fetch_rows(&self.pool)
            .await
    }

    async fn insert_row(&self, table: &str, assignments: &[Assignment]) -> Result<Map<String, Value>, DatabaseError> {
        self.builder(table)
            .await?
            .insert(assignments)
            .fetch_optional_row(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", table)))
    }

    async fn update_row(
        &self,
        table: &str,
        assignments: &[Assignment],
        key: &RowKey,
        key_value: &str,
    ) -> Result<Option<Map<String, Value>>, DatabaseError> {
        self.builder(table)
            .await?
            .update(assignments, key, Value::String(key_value.to_string()))
            .fetch_optional_row(&self.pool)
            .await
    }
}
