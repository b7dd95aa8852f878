// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::manager::DatabaseError;
use crate::database::resource::ResourceError;
use crate::services::reconciler::ReconcileError;
use crate::services::tables::TableError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
    )
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Constraint(msg) => ApiError::bad_request(msg),
            DatabaseError::InvalidIdentifier(name) => ApiError::bad_request(format!("Invalid identifier: {}", name)),
            DatabaseError::Sqlx(sqlx_err) if is_unavailable(&sqlx_err) => {
                tracing::error!("Database unavailable: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::QueryError(msg) => {
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            err @ (DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl) => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::internal_server_error("Database is not configured")
            }
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Validation(field_errors) => {
                ApiError::validation_error("Invalid form definition", Some(field_errors))
            }
            err @ (ReconcileError::FormNotFound(_) | ReconcileError::UnknownNode { .. }) => {
                ApiError::not_found(err.to_string())
            }
            ReconcileError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::NotFound(_) | TableError::RowNotFound { .. } => ApiError::not_found(err.to_string()),
            TableError::UnknownColumns { .. } => {
                let field_errors = err.field_errors();
                ApiError::validation_error(err.to_string(), field_errors)
            }
            TableError::InvalidName(_) | TableError::EmptyUpdate(_) => ApiError::bad_request(err.to_string()),
            TableError::Database(DatabaseError::Conflict(msg)) => ApiError::conflict(msg),
            TableError::Database(DatabaseError::Sqlx(sqlx_err)) if is_unavailable(&sqlx_err) => {
                DatabaseError::Sqlx(sqlx_err).into()
            }
            TableError::Database(db_err) => {
                // Rejected statements against user tables are the caller's problem
                tracing::warn!("Table access failed: {}", db_err);
                ApiError::bad_request(format!("Error accessing table: {}", db_err))
            }
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Validation(name, field_errors) => {
                ApiError::validation_error(format!("Invalid {}", name.to_lowercase()), Some(field_errors))
            }
            ResourceError::NotFound { .. } => ApiError::not_found(err.to_string()),
            ResourceError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Body limit failures surface through the JSON extractor
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::payload_too_large(rejection.body_text());
        }
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Decode an already-parsed JSON body into a typed payload
pub fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::invalid_json(format!("Invalid request body: {}", e)))
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    #[test]
    fn validation_error_carries_field_errors() {
        let mut errors = HashMap::new();
        errors.insert("sections[0].section_order".to_string(), "Required".to_string());
        let err: ApiError = ReconcileError::Validation(errors).into();

        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["sections[0].section_order"], "Required");
    }

    #[test]
    fn unknown_node_is_not_found() {
        let err: ApiError = ReconcileError::UnknownNode {
            kind: NodeKind::Row,
            id: 9,
            parent_kind: NodeKind::Section,
            parent_id: Some(2),
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Row 9 not found in Section 2");
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let conflict: ApiError = DatabaseError::Conflict("duplicate key".into()).into();
        assert_eq!(conflict.status_code(), 409);

        let constraint: ApiError = DatabaseError::Constraint("null value".into()).into();
        assert_eq!(constraint.status_code(), 400);

        let query: ApiError = DatabaseError::QueryError("syntax error".into()).into();
        assert_eq!(query.status_code(), 500);
        assert!(!query.message().contains("syntax"));

        let table: ApiError = TableError::Database(DatabaseError::QueryError("bad cast".into())).into();
        assert_eq!(table.status_code(), 400);
        assert!(table.message().contains("bad cast"));
    }
}
