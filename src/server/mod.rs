mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;
pub use self::types::{ErrorResponse, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    paths(api::health_handler, api::extract_handler),
    components(schemas(
        types::ExtractForm,
        types::HealthResponse,
        types::ErrorResponse,
        crate::service::EmbeddingResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>, upload_limit: usize) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/extract-embedding", post(api::extract_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
