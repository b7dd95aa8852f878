//! Typed CRUD for the fixed application resources (products, wordings).

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::marker::PhantomData;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{is_exact_numeric, Assignment, QueryBuilder, RowKey};
use crate::services::validation::FieldErrors;
use tracing::info;

/// Column of a resource table as declared in the migration
#[derive(Debug, Clone, Copy)]
pub struct ResourceColumn {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub unique: bool,
    pub nullable: bool,
    /// Column default in `information_schema` spelling, e.g. `false`
    pub default: Option<&'static str>,
}

impl ResourceColumn {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            unique: false,
            nullable: true,
            default: None,
        }
    }

    pub const fn unique(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            unique: true,
            ..Self::new(name, sql_type)
        }
    }

    pub const fn not_null(self) -> Self {
        Self { nullable: false, ..self }
    }

    pub const fn default_to(self, expression: &'static str) -> Self {
        Self {
            default: Some(expression),
            ..self
        }
    }
}

/// A stored resource: an `Input` plus the id assigned on insert
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Input: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Singular display name used in error messages
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Every column except `id`
    const COLUMNS: &'static [ResourceColumn];

    fn id(&self) -> i64;
    fn assemble(id: i64, input: Self::Input) -> Self;
    fn validate(input: &Self::Input) -> Result<(), FieldErrors>;
}

#[async_trait]
pub trait ResourceStore<T: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, DatabaseError>;
    async fn get(&self, id: i64) -> Result<Option<T>, DatabaseError>;
    async fn create(&self, input: &T::Input) -> Result<T, DatabaseError>;
    async fn update(&self, id: i64, input: &T::Input) -> Result<Option<T>, DatabaseError>;
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid {0}")]
    Validation(&'static str, FieldErrors),

    #[error("{name} {id} not found")]
    NotFound { name: &'static str, id: i64 },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Validated CRUD on top of any [`ResourceStore`]
pub struct Resources<'a, T: Resource> {
    store: &'a dyn ResourceStore<T>,
}

impl<'a, T: Resource> Resources<'a, T> {
    pub fn new(store: &'a dyn ResourceStore<T>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<T>, ResourceError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<T, ResourceError> {
        self.store.get(id).await?.ok_or(ResourceError::NotFound { name: T::NAME, id })
    }

    pub async fn create(&self, input: &T::Input) -> Result<T, ResourceError> {
        T::validate(input).map_err(|errors| ResourceError::Validation(T::NAME, errors))?;
        let created = self.store.create(input).await?;
        info!(resource = T::NAME, id = created.id(), "created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: &T::Input) -> Result<T, ResourceError> {
        T::validate(input).map_err(|errors| ResourceError::Validation(T::NAME, errors))?;
        let updated = self
            .store
            .update(id, input)
            .await?
            .ok_or(ResourceError::NotFound { name: T::NAME, id })?;
        info!(resource = T::NAME, id, "updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ResourceError> {
        if !self.store.delete(id).await? {
            return Err(ResourceError::NotFound { name: T::NAME, id });
        }
        info!(resource = T::NAME, id, "deleted");
        Ok(())
    }
}

/// Serialized input as column assignments, in `COLUMNS` order
pub fn assignments<T: Resource>(input: &T::Input) -> Result<Vec<Assignment>, DatabaseError> {
    let map = match serde_json::to_value(input) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(DatabaseError::QueryError(format!("{} input is not an object", T::NAME))),
        Err(e) => return Err(DatabaseError::QueryError(e.to_string())),
    };

    Ok(T::COLUMNS
        .iter()
        .map(|c| Assignment::new(c.name, c.sql_type, map.get(c.name).cloned().unwrap_or(Value::Null)))
        .collect())
}

pub fn from_row<T: Resource>(row: Map<String, Value>) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| DatabaseError::QueryError(format!("failed to decode {}: {}", T::NAME, e)))
}

pub struct PgResourceStore<T> {
    pool: PgPool,
    _phantom: PhantomData<T>,
}

impl<T: Resource> PgResourceStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    fn builder() -> Result<QueryBuilder, DatabaseError> {
        let numeric = T::COLUMNS.iter().filter(|c| is_exact_numeric(c.sql_type)).map(|c| c.name);
        Ok(QueryBuilder::new(T::TABLE)?.with_text_columns(numeric))
    }

    fn key() -> RowKey {
        RowKey::new("id", "int8")
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for PgResourceStore<T> {
    async fn list(&self) -> Result<Vec<T>, DatabaseError> {
        let rows = Self::builder()?.select_all(Some("id"), None, None).fetch_rows(&self.pool).await?;
        rows.into_iter().map(from_row::<T>).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        Self::builder()?
            .select_by_key(&Self::key(), Value::from(id))
            .fetch_optional_row(&self.pool)
            .await?
            .map(from_row::<T>)
            .transpose()
    }

    async fn create(&self, input: &T::Input) -> Result<T, DatabaseError> {
        let row = Self::builder()?
            .insert(&assignments::<T>(input)?)
            .fetch_optional_row(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", T::TABLE)))?;
        from_row(row)
    }

    async fn update(&self, id: i64, input: &T::Input) -> Result<Option<T>, DatabaseError> {
        Self::builder()?
            .update(&assignments::<T>(input)?, &Self::key(), Value::from(id))
            .fetch_optional_row(&self.pool)
            .await?
            .map(from_row::<T>)
            .transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let affected = Self::builder()?
            .delete(&Self::key(), Value::from(id))
            .execute(&self.pool)
            .await?;
        Ok(affected > 0)
    }
}
