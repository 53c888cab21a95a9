use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cli::*;
use crate::face::{EmbeddingExtractor, OpenCvEmbedder};
use crate::store::{CollectionSchema, Distance, WeaviateCollection};

/// 人脸特征模型配置
#[derive(Parser, Debug, Clone)]
pub struct ModelOptions {
    /// 模型名称，会随提取结果一起返回
    #[arg(long, env = "FACEREG_MODEL_NAME", default_value = "Facenet512")]
    pub model_name: String,
    /// YuNet 人脸检测模型（ONNX）
    #[arg(
        long,
        env = "FACEREG_DETECTOR_MODEL",
        value_name = "FILE",
        default_value = "models/face_detection_yunet.onnx"
    )]
    pub detector_model: PathBuf,
    /// 人脸特征模型（ONNX，输入为 1x3xSIZExSIZE）
    #[arg(long, env = "FACEREG_EMBEDDING_MODEL", value_name = "FILE", default_value = "models/facenet512.onnx")]
    pub embedding_model: PathBuf,
    /// 特征向量维度，所有提取结果都必须满足
    #[arg(long, value_name = "N", default_value_t = 512)]
    pub dimension: usize,
    /// 特征模型的输入尺寸
    #[arg(long, value_name = "SIZE", default_value_t = 160)]
    pub input_size: i32,
    /// 人脸检测置信度阈值
    #[arg(long, value_name = "SCORE", default_value_t = 0.9)]
    pub score_threshold: f32,
    /// 人脸检测 NMS 阈值
    #[arg(long, value_name = "THRESHOLD", default_value_t = 0.3)]
    pub nms_threshold: f32,
    /// 单张图片的最长处理时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

impl ModelOptions {
    /// 加载模型并构建特征提取器
    pub fn extractor(&self) -> Result<EmbeddingExtractor> {
        let embedder = OpenCvEmbedder::open(self).with_context(|| {
            format!(
                "加载模型失败: {} / {}",
                self.detector_model.display(),
                self.embedding_model.display()
            )
        })?;
        Ok(EmbeddingExtractor::new(
            Arc::new(embedder),
            self.dimension,
            Duration::from_secs(self.timeout),
        ))
    }
}

/// 向量数据库配置
#[derive(Parser, Clone)]
pub struct StoreOptions {
    /// Weaviate 地址，未指定协议时默认使用 https
    #[arg(long, env = "WEAVIATE_URL", hide_env_values = true, default_value = "http://127.0.0.1:8080")]
    pub weaviate_url: String,
    /// Weaviate API key
    #[arg(long, env = "WEAVIATE_API_KEY", hide_env_values = true)]
    pub weaviate_api_key: Option<String>,
    /// 集合名称
    #[arg(long, env = "FACEREG_COLLECTION", default_value = "FaceEmbedding")]
    pub collection: String,
    /// HNSW 构建时的候选列表大小
    #[arg(long, value_name = "N", default_value_t = 128)]
    pub ef_construction: usize,
    /// HNSW 每个节点的最大连接数
    #[arg(long, value_name = "N", default_value_t = 64)]
    pub max_connections: usize,
    /// 单次请求超时，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub request_timeout: u64,
}

impl StoreOptions {
    pub fn schema(&self, dimension: usize) -> CollectionSchema {
        CollectionSchema {
            name: self.collection.clone(),
            dimension,
            distance: Distance::Cosine,
            ef_construction: self.ef_construction,
            max_connections: self.max_connections,
        }
    }

    /// 连接 Weaviate 并确认服务可用
    pub async fn connect(&self, dimension: usize) -> Result<WeaviateCollection> {
        let collection = WeaviateCollection::new(self, self.schema(dimension))?;
        collection.ready().await.context("无法使用向量数据库，请检查 --weaviate-url（WEAVIATE_URL）与 API key")?;
        Ok(collection)
    }
}

// 地址与 API key 不允许出现在日志中
impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("weaviate_url", &"<redacted>")
            .field("weaviate_api_key", &self.weaviate_api_key.as_ref().map(|_| "<redacted>"))
            .field("collection", &self.collection)
            .field("ef_construction", &self.ef_construction)
            .field("max_connections", &self.max_connections)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP 服务配置
#[derive(Parser, Debug, Clone)]
pub struct ServerOptions {
    /// 监听地址
    #[arg(long, env = "FACEREG_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: SocketAddr,
    /// 上传图片的大小限制，单位为字节
    #[arg(long, value_name = "BYTES", default_value_t = 10 * 1024 * 1024)]
    pub upload_limit: usize,
    /// 存放上传图片的临时目录
    #[arg(long, env = "FACEREG_TEMP_DIR", value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}

impl ServerOptions {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "facereg", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 重建向量集合，原有数据会被清空
    Setup(SetupCommand),
    /// 批量注册人员照片
    Register(RegisterCommand),
    /// 提取单张图片的人脸特征
    Extract(ExtractCommand),
    /// 显示集合中的特征数量
    Stats(StatsCommand),
    /// 启动 HTTP 特征提取服务
    Server(ServerCommand),
}
