//! Sili: ordering backend for a single food vendor.
//!
//! Customers browse the catalog, fill a session-scoped cart and check out
//! for pickup; staff manage the catalog, work the order queue and read the
//! sales dashboard. Everything is thin request/response glue over
//! PostgreSQL, so the interesting guarantees live in two places: the
//! session store ([`session`]) and the checkout transaction
//! ([`routes::customer::checkout`]).

use std::sync::Arc;

use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
    services::ServeDir,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ApiError;
use middleware::auth::session_middleware;
use state::{AppState, State};

pub mod config;
pub mod entity;
pub mod error;
mod middleware;
pub mod openapi;
mod routes;
pub mod session;
pub mod state;
pub mod utils;

pub use axum;
pub use sea_orm;

pub mod auth {
    use crate::middleware;
    pub use middleware::auth::AppUser;
}

pub fn construct_router(state: Arc<State>) -> Router {
    let media_dir = state.config.media_dir.clone();

    let router = Router::new()
        .route("/", get(service_info))
        .nest("/health", routes::health::routes())
        .nest("/auth", routes::auth::routes())
        .nest("/customer", routes::customer::routes())
        .nest("/admin", routes::admin::routes())
        .with_state(state.clone())
        .route("/version", get(|| async { env!("CARGO_PKG_VERSION") }))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new()
        .nest("/api/v1", router)
        .nest_service("/media", ServeDir::new(media_dir))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

#[tracing::instrument(name = "GET /")]
async fn service_info() -> Result<Json<ServiceInfo>, ApiError> {
    Ok(Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
