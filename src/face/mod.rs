mod cv;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, spawn_blocking};

pub use self::cv::OpenCvEmbedder;
use crate::metrics;

/// 人脸特征提取的失败类型
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 图片中没有找到人脸，属于可预期的结果
    #[error("未检测到人脸")]
    NoFaceDetected,
    #[error("无法解码图片: {0}")]
    Decode(String),
    #[error("提取超时（{0:?}）")]
    Timeout(Duration),
    #[error("特征维度不符：期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("模型处理失败: {0}")]
    Model(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("提取任务异常退出: {0}")]
    Join(#[from] JoinError),
}

impl ExtractError {
    pub fn is_no_face(&self) -> bool {
        matches!(self, Self::NoFaceDetected)
    }

    /// 指标中使用的结果标签
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::NoFaceDetected => "no_face",
            _ => "error",
        }
    }
}

/// 人脸检测、对齐与特征计算能力
///
/// 实现必须强制检测：找不到人脸时返回 [`ExtractError::NoFaceDetected`]，
/// 而不是返回空向量或全零向量。返回值按检测顺序排列，每张人脸一个向量。
pub trait FaceEmbedder: Send + Sync {
    fn represent(&self, image: &Path) -> Result<Vec<Vec<f32>>, ExtractError>;
}

/// 单张图片的提取结果
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEmbedding {
    /// 第一张人脸的特征向量
    pub vector: Vec<f32>,
    /// 检测到的人脸数量
    pub faces_detected: usize,
}

#[derive(Clone)]
pub struct EmbeddingExtractor {
    embedder: Arc<dyn FaceEmbedder>,
    // 模型同一时间只处理一张图片，排队时间不计入超时
    permits: Arc<Semaphore>,
    dimension: usize,
    timeout: Duration,
}

impl EmbeddingExtractor {
    pub fn new(embedder: Arc<dyn FaceEmbedder>, dimension: usize, timeout: Duration) -> Self {
        Self { embedder, permits: Arc::new(Semaphore::new(1)), dimension, timeout }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 提取一张图片中的人脸特征
    ///
    /// 模型在阻塞线程中运行，超过时限视为处理失败而不是未检测到人脸。
    pub async fn extract(&self, image: &Path) -> Result<FaceEmbedding, ExtractError> {
        let start = Instant::now();
        let result = self.extract_inner(image).await;
        metrics::observe_extraction(
            result.as_ref().map_or_else(|e| e.outcome(), |_| "ok"),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn extract_inner(&self, image: &Path) -> Result<FaceEmbedding, ExtractError> {
        let permit = self.permits.clone().acquire_owned().await.map_err(|e| ExtractError::Model(e.to_string()))?;
        let embedder = self.embedder.clone();
        let path = image.to_path_buf();
        // 许可随任务释放，超时后仍在运行的任务会继续占用模型
        let task = spawn_blocking(move || {
            let _permit = permit;
            embedder.represent(&path)
        });

        let faces = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined??,
            Err(_) => return Err(ExtractError::Timeout(self.timeout)),
        };

        let faces_detected = faces.len();
        let Some(vector) = faces.into_iter().next() else {
            return Err(ExtractError::NoFaceDetected);
        };
        if vector.len() != self.dimension {
            return Err(ExtractError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(FaceEmbedding { vector, faces_detected })
    }
}
