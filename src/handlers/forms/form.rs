use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Extension, Path},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::database::models::form::{FormInput, FormTree};
use crate::error::decode;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FormService;

/// GET /form/:form_id - load one tree, soft-deleted forms included
pub async fn get(
    Extension(service): Extension<Arc<FormService>>,
    form_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<FormTree> {
    let Path(form_id) = form_id?;
    let tree = service.load(form_id).await?;
    Ok(ApiResponse::success(tree))
}

/// PUT /form/:form_id - reconcile the persisted tree with the submitted one
///
/// Children with an `id` are updated, children without one are inserted,
/// persisted children missing from the submission are deleted.
pub async fn put(
    Extension(service): Extension<Arc<FormService>>,
    form_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FormTree> {
    let Path(form_id) = form_id?;
    let Json(payload) = payload?;
    let input: FormInput = decode(payload)?;

    let reconciled = service.update(form_id, &input).await?;
    Ok(ApiResponse::success(reconciled.tree))
}

/// DELETE /form/soft-delete/:form_id
pub async fn soft_delete(
    Extension(service): Extension<Arc<FormService>>,
    form_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(form_id) = form_id?;
    service.soft_delete(form_id).await?;
    Ok(ApiResponse::success(json!({ "id": form_id, "is_deleted": true })))
}
