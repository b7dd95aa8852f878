pub mod dynamic;
pub mod form_store;
pub mod manager;
pub mod memory;
pub mod models;
pub mod query_builder;
pub mod resource;

pub use manager::{DatabaseError, DatabaseManager};

use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use dynamic::{PgTableStore, TableStore};
use form_store::{FormStore, PgFormStore};
use memory::{MemoryFormStore, MemoryResourceStore, MemoryTableStore};
use models::{Product, Wording};
use resource::{PgResourceStore, ResourceStore};

/// Storage handles shared by every request handler
#[derive(Clone)]
pub struct Stores {
    pub forms: Arc<dyn FormStore>,
    pub tables: Arc<dyn TableStore>,
    pub products: Arc<dyn ResourceStore<Product>>,
    pub wordings: Arc<dyn ResourceStore<Wording>>,
}

impl Stores {
    /// Connect to PostgreSQL, applying migrations first when `migrate` is set
    pub async fn postgres(config: &AppConfig, migrate: bool) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(&config.database).await?;
        if migrate {
            DatabaseManager::migrate(&pool).await?;
        }

        Ok(Self {
            forms: Arc::new(PgFormStore::new(pool.clone())),
            tables: Arc::new(PgTableStore::new(pool.clone())),
            products: Arc::new(PgResourceStore::<Product>::new(pool.clone())),
            wordings: Arc::new(PgResourceStore::<Wording>::new(pool)),
        })
    }

    /// Process-local storage; the table catalog starts with the resource tables
    pub async fn memory() -> Self {
        let tables = MemoryTableStore::new();
        tables.create_resource_table::<Product>().await;
        tables.create_resource_table::<Wording>().await;
        info!("using in-memory storage");

        Self {
            forms: Arc::new(MemoryFormStore::new()),
            tables: Arc::new(tables),
            products: Arc::new(MemoryResourceStore::<Product>::new()),
            wordings: Arc::new(MemoryResourceStore::<Wording>::new()),
        }
    }
}
