use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{decode, ApiError};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TableService;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /tables/:table/rows - one page of rows, ordered by key
pub async fn get(
    Extension(service): Extension<Arc<TableService>>,
    table: Result<Path<String>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let Path(table) = table?;
    let Query(query) = query?;
    let rows = service.rows(&table, query.limit, query.offset).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /tables/:table/rows - insert one row from a column/value object
pub async fn post(
    Extension(service): Extension<Arc<TableService>>,
    table: Result<Path<String>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let Path(table) = table?;
    let attributes = attributes(payload)?;
    let row = service.insert(&table, &attributes).await?;
    Ok(ApiResponse::created(row))
}

/// PUT /tables/:table/rows/:id - update the supplied columns of one row
pub async fn put(
    Extension(service): Extension<Arc<TableService>>,
    path: Result<Path<(String, String)>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let Path((table, id)) = path?;
    let attributes = attributes(payload)?;
    let row = service.update(&table, &id, &attributes).await?;
    Ok(ApiResponse::success(row))
}

fn attributes(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    let Json(payload) = payload?;
    if !payload.is_object() {
        return Err(ApiError::invalid_json("Request body must be a JSON object"));
    }
    decode(payload)
}
