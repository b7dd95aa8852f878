use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::database::resource::{Resource, ResourceStore, Resources};
use crate::error::decode;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /{resource} - all records ordered by id
pub async fn list<T: Resource>(Extension(store): Extension<Arc<dyn ResourceStore<T>>>) -> ApiResult<Vec<T>> {
    let records = Resources::new(store.as_ref()).list().await?;
    Ok(ApiResponse::success(records))
}

/// POST /{resource}
pub async fn create<T: Resource>(
    Extension(store): Extension<Arc<dyn ResourceStore<T>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<T> {
    let Json(payload) = payload?;
    let input: T::Input = decode(payload)?;

    let created = Resources::new(store.as_ref()).create(&input).await?;
    Ok(ApiResponse::created(created))
}
