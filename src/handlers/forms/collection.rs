use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::database::models::form::{FormInput, FormTree};
use crate::error::decode;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FormService;

/// GET /form - every form that has not been soft-deleted, as full trees
pub async fn list(Extension(service): Extension<Arc<FormService>>) -> ApiResult<Vec<FormTree>> {
    let forms = service.list().await?;
    Ok(ApiResponse::success(forms))
}

/// POST /form/create - insert a form with its whole tree
pub async fn create(
    Extension(service): Extension<Arc<FormService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FormTree> {
    let Json(payload) = payload?;
    let input: FormInput = decode(payload)?;

    let created = service.create(&input).await?;
    Ok(ApiResponse::created(created.tree))
}
