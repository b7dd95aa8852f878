use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::Stores;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "JSON Form API",
            "version": version,
            "description": "Backend for dynamic form definitions and runtime table access",
            "endpoints": {
                "home": "/",
                "health": "/health",
                "tables": "/tables, /tables/:table/fields, /tables/:table/rows[/:id]",
                "forms": "/form, /form/create, /form/:form_id, /form/soft-delete/:form_id",
                "products": "/products[/:id]",
                "wordings": "/wordings[/:id]"
            }
        }
    }))
}

/// GET /health - 200 when storage answers, 503 otherwise
pub async fn health(Extension(stores): Extension<Stores>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match stores.forms.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
