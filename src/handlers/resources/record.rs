use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Extension, Path},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::database::resource::{Resource, ResourceStore, Resources};
use crate::error::decode;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /{resource}/:id
pub async fn get<T: Resource>(
    Extension(store): Extension<Arc<dyn ResourceStore<T>>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<T> {
    let Path(id) = id?;
    let record = Resources::new(store.as_ref()).get(id).await?;
    Ok(ApiResponse::success(record))
}

/// PUT /{resource}/:id - full replacement of the editable columns
pub async fn put<T: Resource>(
    Extension(store): Extension<Arc<dyn ResourceStore<T>>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<T> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let input: T::Input = decode(payload)?;

    let updated = Resources::new(store.as_ref()).update(id, &input).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /{resource}/:id
pub async fn delete<T: Resource>(
    Extension(store): Extension<Arc<dyn ResourceStore<T>>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    Resources::new(store.as_ref()).delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
