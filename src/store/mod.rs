mod memory;
mod weaviate;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryCollection;
pub use weaviate::{WeaviateCollection, normalize_endpoint};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("认证失败（{status}），请检查地址与 API key: {body}")]
    Unauthorized { status: StatusCode, body: String },
    #[error("无法访问向量数据库: {0}")]
    Unreachable(reqwest::Error),
    #[error("向量数据库拒绝了请求（{status}）: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("向量维度不符：集合为 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("无法解析向量数据库响应: {0}")]
    Decode(String),
}

// 地址属于凭据，不随错误信息输出
impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.without_url())
    }
}

/// 向量距离度量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
}

/// 集合的结构与索引参数，只能通过重建修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
    pub ef_construction: usize,
    pub max_connections: usize,
}

impl CollectionSchema {
    pub fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// 一条人脸记录，每张注册成功的照片对应一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub person_name: String,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait VectorCollection: Send + Sync {
    fn schema(&self) -> &CollectionSchema;

    /// 删除同名集合（不存在时忽略）并按 schema 重新创建
    async fn recreate(&self) -> Result<(), StoreError>;

    /// 追加一条记录，同一人可以有任意多条
    async fn insert(&self, person_name: &str, vector: Vec<f32>) -> Result<(), StoreError>;

    /// 集合中的记录总数
    async fn count(&self) -> Result<u64, StoreError>;
}
