use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Live description of one column of a dynamic table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TableColumn {
    pub name: String,
    /// SQL standard type name, e.g. `character varying`
    pub data_type: String,
    /// PostgreSQL type name usable in casts, e.g. `varchar`
    pub udt_name: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    /// `PRI`, `UNI`, `MUL` or empty
    pub column_key: String,
}

impl TableColumn {
    pub fn is_primary_key(&self) -> bool {
        self.column_key == "PRI"
    }

    /// A value must be supplied on insert
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default_value.is_none()
    }
}

/// Field entry returned by `GET /tables/:table/fields`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub key: String,
    pub default: Option<String>,
}

impl From<&TableColumn> for FieldDescription {
    fn from(column: &TableColumn) -> Self {
        FieldDescription {
            name: column.name.clone(),
            field_type: column.data_type.clone(),
            required: column.is_required(),
            key: column.column_key.clone(),
            default: column.default_value.clone(),
        }
    }
}
