use anyhow::Context;
use tracing::info;

use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle() -> anyhow::Result<()> {
    let config = config();
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
    info!("Migrations complete");
    Ok(())
}
