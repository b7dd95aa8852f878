use axum::extract::{rejection::PathRejection, Extension, Path};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TableService;

/// GET /tables - user tables of the current schema
pub async fn list(Extension(service): Extension<Arc<TableService>>) -> ApiResult<Value> {
    let tables = service.list_tables().await?;
    Ok(ApiResponse::success(json!({ "tables": tables })))
}

/// GET /tables/:table/fields - live column descriptions
pub async fn fields(
    Extension(service): Extension<Arc<TableService>>,
    table: Result<Path<String>, PathRejection>,
) -> ApiResult<Value> {
    let Path(table) = table?;
    let fields = service.describe(&table).await?;
    Ok(ApiResponse::success(json!({ "table": table, "fields": fields })))
}
