//! Persisted form definition tree: Form → Section → Row → Column → Field.
//!
//! Every level is split into an `*Attrs` struct (the user-editable columns)
//! and the stored row (id, parent id, attrs). Submissions use the `*Input`
//! types, where the id is optional: present means "update this node",
//! absent means "insert a new one".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FormAttrs {
    pub form_name: String,
    pub submit_api_route: String,
    #[serde(default)]
    pub table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Form {
    pub id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attrs: FormAttrs,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SectionAttrs {
    pub section_name: String,
    #[serde(default)]
    pub is_collapsable: bool,
    pub section_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: i64,
    pub form_id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attrs: SectionAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RowAttrs {
    pub row_name: String,
    pub row_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Row {
    pub id: i64,
    pub section_id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attrs: RowAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ColumnAttrs {
    pub column_name: String,
    pub column_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Column {
    pub id: i64,
    pub row_id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attrs: ColumnAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FieldAttrs {
    /// Free-form renderer configuration
    pub config: Value,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub max_length: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Field {
    pub id: i64,
    pub column_id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attrs: FieldAttrs,
}

// Loaded trees (response shape)

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTree {
    #[serde(flatten)]
    pub form: Form,
    pub sections: Vec<SectionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTree {
    #[serde(flatten)]
    pub section: Section,
    pub rows: Vec<RowTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowTree {
    #[serde(flatten)]
    pub row: Row,
    pub columns: Vec<ColumnTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTree {
    #[serde(flatten)]
    pub column: Column,
    pub fields: Vec<Field>,
}

// Submitted trees (request shape)

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(flatten)]
    pub attrs: FormAttrs,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub attrs: SectionAttrs,
    #[serde(default)]
    pub rows: Vec<RowInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub attrs: RowAttrs,
    #[serde(default)]
    pub columns: Vec<ColumnInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub attrs: ColumnAttrs,
    #[serde(default)]
    pub fields: Vec<FieldInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub attrs: FieldAttrs,
}

/// A loaded tree resubmitted as-is keeps every id, so reconciling it is a no-op
impl From<&FormTree> for FormInput {
    fn from(tree: &FormTree) -> Self {
        FormInput {
            attrs: tree.form.attrs.clone(),
            sections: tree
                .sections
                .iter()
                .map(|s| SectionInput {
                    id: Some(s.section.id),
                    attrs: s.section.attrs.clone(),
                    rows: s
                        .rows
                        .iter()
                        .map(|r| RowInput {
                            id: Some(r.row.id),
                            attrs: r.row.attrs.clone(),
                            columns: r
                                .columns
                                .iter()
                                .map(|c| ColumnInput {
                                    id: Some(c.column.id),
                                    attrs: c.column.attrs.clone(),
                                    fields: c
                                        .fields
                                        .iter()
                                        .map(|f| FieldInput {
                                            id: Some(f.id),
                                            attrs: f.attrs.clone(),
                                        })
                                        .collect(),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
