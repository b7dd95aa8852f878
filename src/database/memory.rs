//! In-process storage backend, selected with `serve --memory` and used by tests.
//!
//! Mirrors the PostgreSQL behavior the services rely on: id sequences,
//! child ordering, cascading deletes, unique columns and NOT NULL checks.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::database::dynamic::TableStore;
use crate::database::form_store::FormStore;
use crate::database::manager::DatabaseError;
use crate::database::models::form::{
    Column, ColumnAttrs, Field, FieldAttrs, Form, FormAttrs, Row, RowAttrs, Section, SectionAttrs,
};
use crate::database::models::table::TableColumn;
use crate::database::query_builder::{Assignment, RowKey};
use crate::database::resource::{assignments, Resource, ResourceStore};

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct FormTables {
    form_seq: i64,
    section_seq: i64,
    row_seq: i64,
    column_seq: i64,
    field_seq: i64,
    forms: BTreeMap<i64, Form>,
    sections: BTreeMap<i64, Section>,
    rows: BTreeMap<i64, Row>,
    columns: BTreeMap<i64, Column>,
    fields: BTreeMap<i64, Field>,
}

impl FormTables {
    fn remove_section(&mut self, id: i64) -> bool {
        let removed = self.sections.remove(&id).is_some();
        let rows: Vec<i64> = self.rows.values().filter(|r| r.section_id == id).map(|r| r.id).collect();
        for row_id in rows {
            self.remove_row(row_id);
        }
        removed
    }

    fn remove_row(&mut self, id: i64) -> bool {
        let removed = self.rows.remove(&id).is_some();
        let columns: Vec<i64> = self.columns.values().filter(|c| c.row_id == id).map(|c| c.id).collect();
        for column_id in columns {
            self.remove_column(column_id);
        }
        removed
    }

    fn remove_column(&mut self, id: i64) -> bool {
        let removed = self.columns.remove(&id).is_some();
        self.fields.retain(|_, f| f.column_id != id);
        removed
    }
}

#[derive(Default)]
pub struct MemoryFormStore {
    inner: RwLock<FormTables>,
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sections, rows, columns and fields
    pub async fn node_counts(&self) -> (usize, usize, usize, usize) {
        let t = self.inner.read().await;
        (t.sections.len(), t.rows.len(), t.columns.len(), t.fields.len())
    }
}

#[async_trait]
impl FormStore for MemoryFormStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn list_forms(&self, include_deleted: bool) -> Result<Vec<Form>, DatabaseError> {
        let t = self.inner.read().await;
        Ok(t.forms.values().filter(|f| include_deleted || !f.is_deleted).cloned().collect())
    }

    async fn get_form(&self, id: i64) -> Result<Option<Form>, DatabaseError> {
        Ok(self.inner.read().await.forms.get(&id).cloned())
    }

    async fn insert_form(&self, attrs: &FormAttrs) -> Result<Form, DatabaseError> {
        let mut t = self.inner.write().await;
        let now = Utc::now();
        let form = Form {
            id: next(&mut t.form_seq),
            attrs: attrs.clone(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        t.forms.insert(form.id, form.clone());
        Ok(form)
    }

    async fn update_form(&self, id: i64, attrs: &FormAttrs) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        match t.forms.get_mut(&id) {
            Some(form) => {
                form.attrs = attrs.clone();
                form.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_form(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        match t.forms.get_mut(&id) {
            Some(form) => {
                form.is_deleted = true;
                form.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_sections(&self, form_id: i64) -> Result<Vec<Section>, DatabaseError> {
        let t = self.inner.read().await;
        let mut sections: Vec<Section> = t.sections.values().filter(|s| s.form_id == form_id).cloned().collect();
        sections.sort_by_key(|s| (s.attrs.section_order, s.id));
        Ok(sections)
    }

    async fn insert_section(&self, form_id: i64, attrs: &SectionAttrs) -> Result<Section, DatabaseError> {
        let mut t = self.inner.write().await;
        if !t.forms.contains_key(&form_id) {
            return Err(DatabaseError::Constraint(format!("form {} does not exist", form_id)));
        }
        let section = Section {
            id: next(&mut t.section_seq),
            form_id,
            attrs: attrs.clone(),
        };
        t.sections.insert(section.id, section.clone());
        Ok(section)
    }

    async fn update_section(&self, id: i64, attrs: &SectionAttrs) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        Ok(t.sections.get_mut(&id).map(|s| s.attrs = attrs.clone()).is_some())
    }

    async fn delete_section(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.remove_section(id))
    }

    async fn list_rows(&self, section_id: i64) -> Result<Vec<Row>, DatabaseError> {
        let t = self.inner.read().await;
        let mut rows: Vec<Row> = t.rows.values().filter(|r| r.section_id == section_id).cloned().collect();
        rows.sort_by_key(|r| (r.attrs.row_order, r.id));
        Ok(rows)
    }

    async fn insert_row(&self, section_id: i64, attrs: &RowAttrs) -> Result<Row, DatabaseError> {
        let mut t = self.inner.write().await;
        if !t.sections.contains_key(&section_id) {
            return Err(DatabaseError::Constraint(format!("section {} does not exist", section_id)));
        }
        let row = Row {
            id: next(&mut t.row_seq),
            section_id,
            attrs: attrs.clone(),
        };
        t.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_row(&self, id: i64, attrs: &RowAttrs) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        Ok(t.rows.get_mut(&id).map(|r| r.attrs = attrs.clone()).is_some())
    }

    async fn delete_row(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.remove_row(id))
    }

    async fn list_columns(&self, row_id: i64) -> Result<Vec<Column>, DatabaseError> {
        let t = self.inner.read().await;
        let mut columns: Vec<Column> = t.columns.values().filter(|c| c.row_id == row_id).cloned().collect();
        columns.sort_by_key(|c| (c.attrs.column_order, c.id));
        Ok(columns)
    }

    async fn insert_column(&self, row_id: i64, attrs: &ColumnAttrs) -> Result<Column, DatabaseError> {
        let mut t = self.inner.write().await;
        if !t.rows.contains_key(&row_id) {
            return Err(DatabaseError::Constraint(format!("row {} does not exist", row_id)));
        }
        let column = Column {
            id: next(&mut t.column_seq),
            row_id,
            attrs: attrs.clone(),
        };
        t.columns.insert(column.id, column.clone());
        Ok(column)
    }

    async fn update_column(&self, id: i64, attrs: &ColumnAttrs) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        Ok(t.columns.get_mut(&id).map(|c| c.attrs = attrs.clone()).is_some())
    }

    async fn delete_column(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.remove_column(id))
    }

    async fn list_fields(&self, column_id: i64) -> Result<Vec<Field>, DatabaseError> {
        let t = self.inner.read().await;
        Ok(t.fields.values().filter(|f| f.column_id == column_id).cloned().collect())
    }

    async fn insert_field(&self, column_id: i64, attrs: &FieldAttrs) -> Result<Field, DatabaseError> {
        let mut t = self.inner.write().await;
        if !t.columns.contains_key(&column_id) {
            return Err(DatabaseError::Constraint(format!("column {} does not exist", column_id)));
        }
        let field = Field {
            id: next(&mut t.field_seq),
            column_id,
            attrs: attrs.clone(),
        };
        t.fields.insert(field.id, field.clone());
        Ok(field)
    }

    async fn update_field(&self, id: i64, attrs: &FieldAttrs) -> Result<bool, DatabaseError> {
        let mut t = self.inner.write().await;
        Ok(t.fields.get_mut(&id).map(|f| f.attrs = attrs.clone()).is_some())
    }

    async fn delete_field(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.fields.remove(&id).is_some())
    }
}

// Resources

struct ResourceTable<T> {
    seq: i64,
    records: BTreeMap<i64, T>,
}

pub struct MemoryResourceStore<T> {
    inner: RwLock<ResourceTable<T>>,
}

impl<T: Resource> MemoryResourceStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ResourceTable {
                seq: 0,
                records: BTreeMap::new(),
            }),
        }
    }

    /// Unique columns must not collide with any other record
    fn check_unique(table: &ResourceTable<T>, input: &T::Input, except: Option<i64>) -> Result<(), DatabaseError> {
        let incoming = assignments::<T>(input)?;
        for column in T::COLUMNS.iter().filter(|c| c.unique) {
            let value = incoming.iter().find(|a| a.column == column.name).map(|a| &a.value);
            for (id, record) in table.records.iter() {
                if Some(*id) == except {
                    continue;
                }
                let existing = serde_json::to_value(record).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
                if value.is_some() && existing.get(column.name) == value {
                    return Err(DatabaseError::Conflict(format!(
                        "duplicate key value violates unique constraint on {}.{}",
                        T::TABLE,
                        column.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<T: Resource> Default for MemoryResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for MemoryResourceStore<T> {
    async fn list(&self) -> Result<Vec<T>, DatabaseError> {
        Ok(self.inner.read().await.records.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn create(&self, input: &T::Input) -> Result<T, DatabaseError> {
        let mut table = self.inner.write().await;
        Self::check_unique(&table, input, None)?;
        let id = next(&mut table.seq);
        let record = T::assemble(id, input.clone());
        table.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, input: &T::Input) -> Result<Option<T>, DatabaseError> {
        let mut table = self.inner.write().await;
        if !table.records.contains_key(&id) {
            return Ok(None);
        }
        Self::check_unique(&table, input, Some(id))?;
        let record = T::assemble(id, input.clone());
        table.records.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }
}

// Dynamic tables

struct MemoryTable {
    columns: Vec<TableColumn>,
    rows: Vec<Map<String, Value>>,
    seq: i64,
}

#[derive(Default)]
pub struct MemoryTableStore {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
}

/// Key values arrive as path text; compare against the stored JSON spelling
fn key_matches(value: Option<&Value>, key_value: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == key_value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == key_value,
    }
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_table(&self, name: impl Into<String>, columns: Vec<TableColumn>) {
        self.tables.write().await.insert(
            name.into(),
            MemoryTable {
                columns,
                rows: Vec::new(),
                seq: 0,
            },
        );
    }

    /// Register a table shaped like a resource: `id` primary key plus its columns
    pub async fn create_resource_table<T: Resource>(&self) {
        let mut columns = vec![TableColumn {
            name: "id".to_string(),
            data_type: "bigint".to_string(),
            udt_name: "int8".to_string(),
            nullable: false,
            default_value: Some(format!("nextval('{}_id_seq'::regclass)", T::TABLE)),
            column_key: "PRI".to_string(),
        }];
        columns.extend(T::COLUMNS.iter().map(|c| TableColumn {
            name: c.name.to_string(),
            data_type: standard_type_name(c.sql_type).to_string(),
            udt_name: c.sql_type.to_string(),
            nullable: c.nullable,
            default_value: c.default.map(str::to_string),
            column_key: if c.unique { "UNI".to_string() } else { String::new() },
        }));
        self.create_table(T::TABLE, columns).await;
    }
}

/// Value of a constant column default such as `false` or `''::character varying`
fn default_literal(expression: &str) -> Value {
    let literal = expression.split("::").next().unwrap_or(expression).trim();
    if let Some(text) = literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')) {
        return Value::String(text.replace("''", "'"));
    }
    serde_json::from_str(literal).unwrap_or(Value::Null)
}

fn standard_type_name(udt_name: &str) -> &str {
    match udt_name {
        "varchar" => "character varying",
        "bool" => "boolean",
        "int4" => "integer",
        "int8" => "bigint",
        other => other,
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn describe(&self, table: &str) -> Result<Vec<TableColumn>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn select_rows(
        &self,
        table: &str,
        _order_by: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let tables = self.tables.read().await;
        let t = tables
            .get(table)
            .ok_or_else(|| DatabaseError::NotFound(format!("relation \"{}\" does not exist", table)))?;
        Ok(t.rows
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_row(&self, table: &str, assignments: &[Assignment]) -> Result<Map<String, Value>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::NotFound(format!("relation \"{}\" does not exist", table)))?;

        let mut row = Map::new();
        for column in t.columns.iter() {
            let supplied = assignments.iter().find(|a| a.column == column.name);
            let mut value = supplied.map(|a| a.value.clone()).unwrap_or(Value::Null);

            if value.is_null() && column.is_primary_key() && column.default_value.is_some() {
                t.seq += 1;
                value = Value::from(t.seq);
            } else if let (None, Some(default)) = (supplied, column.default_value.as_deref()) {
                value = default_literal(default);
            }
            if value.is_null() && column.is_required() {
                return Err(DatabaseError::Constraint(format!(
                    "null value in column \"{}\" violates not-null constraint",
                    column.name
                )));
            }
            row.insert(column.name.clone(), value);
        }

        t.rows.push(row.clone());
        Ok(row)
    }

    async fn update_row(
        &self,
        table: &str,
        assignments: &[Assignment],
        key: &RowKey,
        key_value: &str,
    ) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::NotFound(format!("relation \"{}\" does not exist", table)))?;

        let Some(row) = t.rows.iter_mut().find(|r| key_matches(r.get(&key.column), key_value)) else {
            return Ok(None);
        };
        for assignment in assignments {
            row.insert(assignment.column.clone(), assignment.value.clone());
        }
        Ok(Some(row.clone()))
    }
}
