//! Storage primitives for the form definition tree.
//!
//! The reconciler only ever talks to [`FormStore`]; deleting a node must
//! delete its whole subtree.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::form::{
    Column, ColumnAttrs, Field, FieldAttrs, Form, FormAttrs, Row, RowAttrs, Section, SectionAttrs,
};

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn list_forms(&self, include_deleted: bool) -> Result<Vec<Form>, DatabaseError>;
    async fn get_form(&self, id: i64) -> Result<Option<Form>, DatabaseError>;
    async fn insert_form(&self, attrs: &FormAttrs) -> Result<Form, DatabaseError>;
    async fn update_form(&self, id: i64, attrs: &FormAttrs) -> Result<bool, DatabaseError>;
    async fn soft_delete_form(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn list_sections(&self, form_id: i64) -> Result<Vec<Section>, DatabaseError>;
    async fn insert_section(&self, form_id: i64, attrs: &SectionAttrs) -> Result<Section, DatabaseError>;
    async fn update_section(&self, id: i64, attrs: &SectionAttrs) -> Result<bool, DatabaseError>;
    async fn delete_section(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn list_rows(&self, section_id: i64) -> Result<Vec<Row>, DatabaseError>;
    async fn insert_row(&self, section_id: i64, attrs: &RowAttrs) -> Result<Row, DatabaseError>;
    async fn update_row(&self, id: i64, attrs: &RowAttrs) -> Result<bool, DatabaseError>;
    async fn delete_row(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn list_columns(&self, row_id: i64) -> Result<Vec<Column>, DatabaseError>;
    async fn insert_column(&self, row_id: i64, attrs: &ColumnAttrs) -> Result<Column, DatabaseError>;
    async fn update_column(&self, id: i64, attrs: &ColumnAttrs) -> Result<bool, DatabaseError>;
    async fn delete_column(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn list_fields(&self, column_id: i64) -> Result<Vec<Field>, DatabaseError>;
    async fn insert_field(&self, column_id: i64, attrs: &FieldAttrs) -> Result<Field, DatabaseError>;
    async fn update_field(&self, id: i64, attrs: &FieldAttrs) -> Result<bool, DatabaseError>;
    async fn delete_field(&self, id: i64) -> Result<bool, DatabaseError>;
}

/// PostgreSQL form store; cascades come from the foreign keys in `migrations/`
pub struct PgFormStore {
    pool: PgPool,
}

impl PgFormStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_by_id(&self, table: &str, id: i64) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", DatabaseManager::quote_identifier(table));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

const FORM_COLUMNS: &str = "id, form_name, submit_api_route, table_name, is_deleted, created_at, updated_at";

#[async_trait]
impl FormStore for PgFormStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn list_forms(&self, include_deleted: bool) -> Result<Vec<Form>, DatabaseError> {
        let forms = sqlx::query_as::<_, Form>(&format!(
            "SELECT {} FROM forms WHERE ($1 OR NOT is_deleted) ORDER BY id",
            FORM_COLUMNS
        ))
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;
        Ok(forms)
    }

    async fn get_form(&self, id: i64) -> Result<Option<Form>, DatabaseError> {
        let form = sqlx::query_as::<_, Form>(&format!("SELECT {} FROM forms WHERE id = $1", FORM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(form)
    }

    async fn insert_form(&self, attrs: &FormAttrs) -> Result<Form, DatabaseError> {
        let form = sqlx::query_as::<_, Form>(&format!(
            "INSERT INTO forms (form_name, submit_api_route, table_name) VALUES ($1, $2, $3) RETURNING {}",
            FORM_COLUMNS
        ))
        .bind(&attrs.form_name)
        .bind(&attrs.submit_api_route)
        .bind(&attrs.table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(form)
    }

    async fn update_form(&self, id: i64, attrs: &FormAttrs) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE forms SET form_name = $2, submit_api_route = $3, table_name = $4, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&attrs.form_name)
        .bind(&attrs.submit_api_route)
        .bind(&attrs.table_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_form(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE forms SET is_deleted = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sections(&self, form_id: i64) -> Result<Vec<Section>, DatabaseError> {
        let sections = sqlx::query_as::<_, Section>(
            "SELECT id, form_id, section_name, is_collapsable, section_order FROM form_sections
             WHERE form_id = $1 ORDER BY section_order, id",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sections)
    }

    async fn insert_section(&self, form_id: i64, attrs: &SectionAttrs) -> Result<Section, DatabaseError> {
        let section = sqlx::query_as::<_, Section>(
            "INSERT INTO form_sections (form_id, section_name, is_collapsable, section_order) VALUES ($1, $2, $3, $4)
             RETURNING id, form_id, section_name, is_collapsable, section_order",
        )
        .bind(form_id)
        .bind(&attrs.section_name)
        .bind(attrs.is_collapsable)
        .bind(attrs.section_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(section)
    }

    async fn update_section(&self, id: i64, attrs: &SectionAttrs) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE form_sections SET section_name = $2, is_collapsable = $3, section_order = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&attrs.section_name)
        .bind(attrs.is_collapsable)
        .bind(attrs.section_order)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_section(&self, id: i64) -> Result<bool, DatabaseError> {
        self.delete_by_id("form_sections", id).await
    }

    async fn list_rows(&self, section_id: i64) -> Result<Vec<Row>, DatabaseError> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, section_id, row_name, row_order FROM form_rows
             WHERE section_id = $1 ORDER BY row_order, id",
        )
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_row(&self, section_id: i64, attrs: &RowAttrs) -> Result<Row, DatabaseError> {
        let row = sqlx::query_as::<_, Row>(
            "INSERT INTO form_rows (section_id, row_name, row_order) VALUES ($1, $2, $3)
             RETURNING id, section_id, row_name, row_order",
        )
        .bind(section_id)
        .bind(&attrs.row_name)
        .bind(attrs.row_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_row(&self, id: i64, attrs: &RowAttrs) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE form_rows SET row_name = $2, row_order = $3 WHERE id = $1")
            .bind(id)
            .bind(&attrs.row_name)
            .bind(attrs.row_order)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool, DatabaseError> {
        self.delete_by_id("form_rows", id).await
    }

    async fn list_columns(&self, row_id: i64) -> Result<Vec<Column>, DatabaseError> {
        let columns = sqlx::query_as::<_, Column>(
            "SELECT id, row_id, column_name, column_order FROM form_columns
             WHERE row_id = $1 ORDER BY column_order, id",
        )
        .bind(row_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn insert_column(&self, row_id: i64, attrs: &ColumnAttrs) -> Result<Column, DatabaseError> {
        let column = sqlx::query_as::<_, Column>(
            "INSERT INTO form_columns (row_id, column_name, column_order) VALUES ($1, $2, $3)
             RETURNING id, row_id, column_name, column_order",
        )
        .bind(row_id)
        .bind(&attrs.column_name)
        .bind(attrs.column_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(column)
    }

    async fn update_column(&self, id: i64, attrs: &ColumnAttrs) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE form_columns SET column_name = $2, column_order = $3 WHERE id = $1")
            .bind(id)
            .bind(&attrs.column_name)
            .bind(attrs.column_order)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_column(&self, id: i64) -> Result<bool, DatabaseError> {
        self.delete_by_id("form_columns", id).await
    }

    async fn list_fields(&self, column_id: i64) -> Result<Vec<Field>, DatabaseError> {
        let fields = sqlx::query_as::<_, Field>(
            "SELECT id, column_id, config, data_type, is_required, max_length FROM form_fields
             WHERE column_id = $1 ORDER BY id",
        )
        .bind(column_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    async fn insert_field(&self, column_id: i64, attrs: &FieldAttrs) -> Result<Field, DatabaseError> {
        let field = sqlx::query_as::<_, Field>(
            "INSERT INTO form_fields (column_id, config, data_type, is_required, max_length) VALUES ($1, $2, $3, $4, $5)
             RETURNING id, column_id, config, data_type, is_required, max_length",
        )
        .bind(column_id)
        .bind(&attrs.config)
        .bind(&attrs.data_type)
        .bind(attrs.is_required)
        .bind(attrs.max_length)
        .fetch_one(&self.pool)
        .await?;
        Ok(field)
    }

    async fn update_field(&self, id: i64, attrs: &FieldAttrs) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE form_fields SET config = $2, data_type = $3, is_required = $4, max_length = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&attrs.config)
        .bind(&attrs.data_type)
        .bind(attrs.is_required)
        .bind(attrs.max_length)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_field(&self, id: i64) -> Result<bool, DatabaseError> {
        self.delete_by_id("form_fields", id).await
    }
}
