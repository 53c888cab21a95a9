use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Serialize;
use utoipa::ToSchema;

/// 特征提取请求
#[derive(TryFromMultipart)]
pub struct ExtractRequest {
    // 大小由 RequestBodyLimitLayer 统一限制
    #[form_data(limit = "unlimited")]
    pub image: FieldData<Bytes>,
}

/// 特征提取表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct ExtractForm {
    /// 上传的图片文件，只允许一张
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
}

/// 错误响应
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}
