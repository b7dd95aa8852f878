use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Extension, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::database::models::{Product, Wording};
use crate::database::resource::Resource;
use crate::database::Stores;
use crate::handlers::{forms, resources, system, tables};
use crate::services::{FormService, TableService};

/// Full application router over the given storage
pub fn router(stores: Stores, config: &AppConfig) -> Router {
    let form_service = Arc::new(FormService::new(stores.forms.clone()));
    let table_service = Arc::new(TableService::new(
        stores.tables.clone(),
        &config.introspection,
        &config.api,
    ));

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(table_routes())
        .merge(form_routes())
        .merge(resource_routes::<Product>("/products"))
        .merge(resource_routes::<Wording>("/wordings"))
        .layer(Extension(form_service))
        .layer(Extension(table_service))
        .layer(Extension(stores.products.clone()))
        .layer(Extension(stores.wordings.clone()))
        .layer(Extension(stores))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(config))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

fn table_routes() -> Router {
    use axum::routing::put;

    Router::new()
        .route("/tables", get(tables::table_list))
        .route("/tables/:table/fields", get(tables::table_fields))
        .route("/tables/:table/rows", get(tables::rows_get).post(tables::rows_post))
        .route("/tables/:table/rows/:id", put(tables::rows_put))
}

fn form_routes() -> Router {
    use axum::routing::{delete, post};

    Router::new()
        .route("/form", get(forms::form_list))
        .route("/form/create", post(forms::form_create))
        .route("/form/:form_id", get(forms::form_get).put(forms::form_put))
        .route("/form/soft-delete/:form_id", delete(forms::form_soft_delete))
}

fn resource_routes<T: Resource>(path: &str) -> Router {
    Router::new()
        .route(
            path,
            get(resources::resource_list::<T>).post(resources::resource_create::<T>),
        )
        .route(
            &format!("{}/:id", path),
            get(resources::resource_get::<T>)
                .put(resources::resource_put::<T>)
                .delete(resources::resource_delete::<T>),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if matches!(config.environment, Environment::Development) || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
