//! Introspection and row access for tables that are only known at runtime.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ApiConfig, IntrospectionConfig};
use crate::database::dynamic::TableStore;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::table::{FieldDescription, TableColumn};
use crate::database::query_builder::{Assignment, RowKey};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Invalid table name: {0}")]
    InvalidName(String),

    #[error("Table {0} not found")]
    NotFound(String),

    #[error("Unknown columns for table {table}: {}", .columns.join(", "))]
    UnknownColumns { table: String, columns: Vec<String> },

    #[error("No attributes supplied for table {0}")]
    EmptyUpdate(String),

    #[error("Row {id} not found in table {table}")]
    RowNotFound { table: String, id: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TableError {
    /// Per-column messages for the response's `field_errors`
    pub fn field_errors(&self) -> Option<HashMap<String, String>> {
        match self {
            TableError::UnknownColumns { columns, .. } => Some(
                columns
                    .iter()
                    .map(|c| (c.clone(), "Unknown column".to_string()))
                    .collect(),
            ),
            _ => None,
        }
    }
}

pub struct TableService {
    store: Arc<dyn TableStore>,
    excluded_tables: Vec<String>,
    excluded_prefixes: Vec<String>,
    hidden_columns: Vec<String>,
    default_limit: i64,
    max_limit: i64,
}

impl TableService {
    pub fn new(store: Arc<dyn TableStore>, introspection: &IntrospectionConfig, api: &ApiConfig) -> Self {
        Self {
            store,
            excluded_tables: introspection.excluded_tables.clone(),
            excluded_prefixes: introspection.excluded_prefixes.clone(),
            hidden_columns: introspection.hidden_columns.clone(),
            default_limit: api.default_row_limit,
            max_limit: api.max_row_limit,
        }
    }

    /// Names of user-visible tables; the form tree's own tables are never listed
    pub async fn list_tables(&self) -> Result<Vec<String>, TableError> {
        let tables = self.store.list_tables().await?;
        Ok(tables.into_iter().filter(|t| self.is_visible(t)).collect())
    }

    /// Column descriptions without the hidden bookkeeping columns
    pub async fn describe(&self, table: &str) -> Result<Vec<FieldDescription>, TableError> {
        let columns = self.columns(table).await?;
        Ok(columns
            .iter()
            .filter(|c| !self.hidden_columns.contains(&c.name))
            .map(FieldDescription::from)
            .collect())
    }

    pub async fn rows(
        &self,
        table: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Map<String, Value>>, TableError> {
        let columns = self.columns(table).await?;
        let limit = self.clamp_limit(limit);
        let offset = offset.unwrap_or(0).max(0);
        let order_by = key_column(&columns).map(|c| c.name.as_str());

        debug!(table, limit, offset, "selecting rows");
        Ok(self.store.select_rows(table, order_by, limit, offset).await?)
    }

    pub async fn insert(&self, table: &str, attributes: &Map<String, Value>) -> Result<Map<String, Value>, TableError> {
        let columns = self.columns(table).await?;
        let assignments = build_assignments(table, &columns, attributes)?;
        let row = self.store.insert_row(table, &assignments).await?;
        debug!(table, "row inserted");
        Ok(row)
    }

    /// Update the row whose key column equals `id`
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Map<String, Value>, TableError> {
        let columns = self.columns(table).await?;
        let assignments = build_assignments(table, &columns, attributes)?;
        if assignments.is_empty() {
            return Err(TableError::EmptyUpdate(table.to_string()));
        }

        let key = match key_column(&columns) {
            Some(column) => RowKey::new(&column.name, &column.udt_name),
            None => RowKey::new("id", "text"),
        };

        self.store
            .update_row(table, &assignments, &key, id)
            .await?
            .ok_or_else(|| TableError::RowNotFound {
                table: table.to_string(),
                id: id.to_string(),
            })
    }

    pub fn clamp_limit(&self, limit: Option<i64>) -> i64 {
        limit.unwrap_or(self.default_limit).clamp(1, self.max_limit.max(1))
    }

    fn is_visible(&self, table: &str) -> bool {
        !self.excluded_tables.iter().any(|t| t == table)
            && !self.excluded_prefixes.iter().any(|p| table.starts_with(p.as_str()))
    }

    async fn columns(&self, table: &str) -> Result<Vec<TableColumn>, TableError> {
        if !DatabaseManager::is_valid_identifier(table) {
            return Err(TableError::InvalidName(table.to_string()));
        }
        if !self.is_visible(table) {
            warn!(table, "rejected access to excluded table");
            return Err(TableError::NotFound(table.to_string()));
        }

        let columns = self.store.describe(table).await?;
        if columns.is_empty() {
            return Err(TableError::NotFound(table.to_string()));
        }
        Ok(columns)
    }
}

fn key_column(columns: &[TableColumn]) -> Option<&TableColumn> {
    columns
        .iter()
        .find(|c| c.is_primary_key())
        .or_else(|| columns.iter().find(|c| c.name == "id"))
}

/// Pair each submitted attribute with its column; every name must exist
fn build_assignments(
    table: &str,
    columns: &[TableColumn],
    attributes: &Map<String, Value>,
) -> Result<Vec<Assignment>, TableError> {
    let mut assignments = Vec::with_capacity(attributes.len());
    let mut unknown = Vec::new();

    for (name, value) in attributes {
        match columns.iter().find(|c| &c.name == name) {
            Some(column) => assignments.push(Assignment::new(name, &column.udt_name, value.clone())),
            None => unknown.push(name.clone()),
        }
    }

    if !unknown.is_empty() {
        unknown.sort();
        return Err(TableError::UnknownColumns {
            table: table.to_string(),
            columns: unknown,
        });
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryTableStore;
    use serde_json::json;

    fn column(name: &str, udt_name: &str, nullable: bool, default_value: Option<&str>, key: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: udt_name.to_string(),
            udt_name: udt_name.to_string(),
            nullable,
            default_value: default_value.map(str::to_string),
            column_key: key.to_string(),
        }
    }

    async fn service() -> TableService {
        let store = MemoryTableStore::new();
        store
            .create_table(
                "customers",
                vec![
                    column("id", "int8", false, Some("nextval('customers_id_seq'::regclass)"), "PRI"),
                    column("email", "varchar", false, None, "UNI"),
                    column("nickname", "varchar", true, None, ""),
                ],
            )
            .await;
        store
            .create_table("forms", vec![column("id", "int8", false, Some("1"), "PRI")])
            .await;
        store
            .create_table("form_fields", vec![column("id", "int8", false, Some("1"), "PRI")])
            .await;
        store
            .create_table(
                "formulary",
                vec![
                    column("id", "int8", false, Some("nextval('formulary_id_seq'::regclass)"), "PRI"),
                    column("drug", "varchar", false, None, ""),
                ],
            )
            .await;

        let api = ApiConfig {
            max_request_size_bytes: 1024,
            default_row_limit: 2,
            max_row_limit: 3,
        };
        TableService::new(Arc::new(store), &IntrospectionConfig::default(), &api)
    }

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn lists_only_visible_tables() {
        let service = service().await;
        assert_eq!(
            service.list_tables().await.unwrap(),
            vec!["customers".to_string(), "formulary".to_string()]
        );
    }

    #[tokio::test]
    async fn tables_sharing_the_form_prefix_stay_reachable() {
        let service = service().await;
        let fields = service.describe("formulary").await.unwrap();
        assert_eq!(fields[0].name, "drug");

        let row = service
            .insert("formulary", &attrs(json!({ "drug": "aspirin" })))
            .await
            .unwrap();
        assert_eq!(row["drug"], "aspirin");
        assert!(matches!(service.describe("forms").await, Err(TableError::NotFound(_))));
    }

    #[tokio::test]
    async fn describe_hides_id_and_reports_requiredness() {
        let service = service().await;
        let fields = service.describe("customers").await.unwrap();

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["email", "nickname"]);
        assert!(fields[0].required);
        assert_eq!(fields[0].key, "UNI");
        assert!(!fields[1].required);
    }

    #[tokio::test]
    async fn describe_rejects_bad_and_unknown_tables() {
        let service = service().await;
        assert!(matches!(
            service.describe("customers; drop table x").await,
            Err(TableError::InvalidName(_))
        ));
        assert!(matches!(service.describe("invoices").await, Err(TableError::NotFound(_))));
        assert!(matches!(service.describe("form_fields").await, Err(TableError::NotFound(_))));
    }

    #[tokio::test]
    async fn insert_then_update_by_primary_key() {
        let service = service().await;
        let row = service
            .insert("customers", &attrs(json!({ "email": "a@example.com" })))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(1));
        assert_eq!(row["nickname"], Value::Null);

        let updated = service
            .update("customers", "1", &attrs(json!({ "nickname": "ace" })))
            .await
            .unwrap();
        assert_eq!(updated["nickname"], "ace");
        assert_eq!(updated["email"], "a@example.com");
    }

    #[tokio::test]
    async fn unknown_columns_are_rejected() {
        let service = service().await;
        let err = service
            .insert("customers", &attrs(json!({ "email": "a@example.com", "age": 4, "zip": "x" })))
            .await
            .unwrap_err();

        match &err {
            TableError::UnknownColumns { columns, .. } => assert_eq!(columns, &vec!["age", "zip"]),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.field_errors().unwrap().contains_key("age"));
    }

    #[tokio::test]
    async fn update_of_missing_row_or_empty_body_fails() {
        let service = service().await;
        assert!(matches!(
            service.update("customers", "42", &attrs(json!({ "nickname": "x" }))).await,
            Err(TableError::RowNotFound { .. })
        ));
        assert!(matches!(
            service.update("customers", "42", &Map::new()).await,
            Err(TableError::EmptyUpdate(_))
        ));
    }

    #[tokio::test]
    async fn missing_required_column_surfaces_storage_error() {
        let service = service().await;
        let err = service
            .insert("customers", &attrs(json!({ "nickname": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::Database(DatabaseError::Constraint(_))));
    }

    #[tokio::test]
    async fn rows_respect_limit_and_offset() {
        let service = service().await;
        for i in 0..4 {
            service
                .insert("customers", &attrs(json!({ "email": format!("{}@example.com", i) })))
                .await
                .unwrap();
        }

        assert_eq!(service.rows("customers", None, None).await.unwrap().len(), 2);
        assert_eq!(service.rows("customers", Some(50), None).await.unwrap().len(), 3);

        let page = service.rows("customers", Some(3), Some(3)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["email"], "3@example.com");
    }

    #[test]
    fn key_column_prefers_primary_key() {
        let columns = vec![
            column("id", "int8", false, None, ""),
            column("code", "varchar", false, None, "PRI"),
        ];
        assert_eq!(key_column(&columns).unwrap().name, "code");
        assert_eq!(key_column(&columns[..1]).unwrap().name, "id");
    }
}
