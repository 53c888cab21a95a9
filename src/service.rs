use std::io::Write;
use std::path::PathBuf;

use log::debug;
use serde::Serialize;
use utoipa::ToSchema;

use crate::face::{EmbeddingExtractor, ExtractError};
use crate::utils::sanitize_extension;

/// 特征提取结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingResponse {
    /// 第一张人脸的特征向量
    pub embedding: Vec<f32>,
    /// 检测到的人脸数量，大于 1 时调用方应自行判断是否可信
    pub faces_detected: usize,
    /// 使用的模型名称
    pub model_name: String,
}

/// 单次请求的特征提取，不在调用之间保留任何状态
#[derive(Clone)]
pub struct ExtractionService {
    extractor: EmbeddingExtractor,
    model_name: String,
    temp_dir: PathBuf,
}

impl ExtractionService {
    pub fn new(extractor: EmbeddingExtractor, model_name: String, temp_dir: PathBuf) -> Self {
        Self { extractor, model_name, temp_dir }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 将图片写入临时文件后提取特征
    ///
    /// 每次调用只创建一个临时文件，无论成功与否都会在返回前删除。
    pub async fn extract_one(
        &self,
        image: &[u8],
        extension: Option<&str>,
    ) -> Result<EmbeddingResponse, ExtractError> {
        let mut file = tempfile::Builder::new()
            .prefix("facereg-")
            .suffix(&format!(".{}", sanitize_extension(extension)))
            .tempfile_in(&self.temp_dir)?;
        file.write_all(image)?;
        file.flush()?;
        debug!("写入临时文件 {}（{} 字节）", file.path().display(), image.len());

        let face = self.extractor.extract(file.path()).await?;
        Ok(EmbeddingResponse {
            embedding: face.vector,
            faces_detected: face.faces_detected,
            model_name: self.model_name.clone(),
        })
    }
}
