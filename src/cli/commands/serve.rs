use anyhow::Context;
use tracing::info;

use crate::app;
use crate::cli::ServeArgs;
use crate::config::{config, StorageBackend};
use crate::database::Stores;

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let config = config();
    info!("Starting JSON Form API in {:?} mode", config.environment);

    let stores = if args.memory || config.database.backend == StorageBackend::Memory {
        Stores::memory().await
    } else {
        let migrate = args.migrate || config.database.run_migrations;
        Stores::postgres(config, migrate)
            .await
            .context("failed to initialize database")?
    };

    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("JSON Form API listening on http://{}", bind_addr);

    axum::serve(listener, app::router(stores, config))
        .await
        .context("server error")?;
    Ok(())
}
