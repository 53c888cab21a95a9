use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum_typed_multipart::TypedMultipart;
use log::info;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::metrics;
use crate::service::EmbeddingResponse;

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", model: state.service.model_name().to_owned() })
}

/// 提取上传图片中的人脸特征
#[utoipa::path(
    post,
    path = "/extract-embedding",
    request_body(content = ExtractForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = EmbeddingResponse),
        (status = 400, description = "未检测到人脸", body = ErrorResponse),
        (status = 500, description = "处理失败", body = ErrorResponse),
    )
)]
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<ExtractRequest>,
) -> Result<Json<EmbeddingResponse>> {
    let file_name = data.image.metadata.file_name.as_deref();
    info!("正在提取上传图片: {}", file_name.unwrap_or("<unnamed>"));

    let extension = file_name.and_then(|name| Path::new(name).extension()).and_then(|ext| ext.to_str());
    let response = state.service.extract_one(&data.image.contents, extension).await?;
    Ok(Json(response))
}

/// Prometheus 指标
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = metrics::gather_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
