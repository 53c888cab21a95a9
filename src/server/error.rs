use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};

use super::types::ErrorResponse;
use crate::face::ExtractError;

/// API错误类型
pub struct AppError(pub anyhow::Error);

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self.0.downcast_ref::<ExtractError>() {
            Some(ExtractError::NoFaceDetected) => {
                warn!("请求图片中未检测到人脸");
                (StatusCode::BAD_REQUEST, "No face detected in image".to_string())
            }
            _ => {
                error!("请求处理失败: {:#}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0))
            }
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
