#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use facereg::face::{EmbeddingExtractor, ExtractError, FaceEmbedder};
use facereg::store::{CollectionSchema, Distance, MemoryCollection};

pub const DIM: usize = 4;

/// 按文件内容决定结果的人脸模型
///
/// 内容为数字时表示人脸数量，`corrupt` 表示无法解码，`short` 返回维度错误的向量。
pub struct ScriptedEmbedder;

impl FaceEmbedder for ScriptedEmbedder {
    fn represent(&self, image: &Path) -> Result<Vec<Vec<f32>>, ExtractError> {
        let text = fs::read_to_string(image)?;
        match text.trim() {
            "short" => Ok(vec![vec![0.5; DIM - 1]]),
            other => match other.parse::<usize>() {
                Ok(0) => Err(ExtractError::NoFaceDetected),
                Ok(n) => Ok((0..n).map(|i| vec![i as f32 + 1.0; DIM]).collect()),
                Err(_) => Err(ExtractError::Decode(image.display().to_string())),
            },
        }
    }
}

pub fn extractor() -> EmbeddingExtractor {
    EmbeddingExtractor::new(Arc::new(ScriptedEmbedder), DIM, Duration::from_secs(5))
}

pub fn schema(dimension: usize) -> CollectionSchema {
    CollectionSchema {
        name: "FaceEmbeddingTest".to_string(),
        dimension,
        distance: Distance::Cosine,
        ef_construction: 128,
        max_connections: 64,
    }
}

pub fn collection() -> Arc<MemoryCollection> {
    Arc::new(MemoryCollection::new(schema(DIM)))
}

/// 在目录中写入若干 (文件名, 内容) 形式的图片
pub fn write_images(dir: &Path, images: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in images {
        fs::write(dir.join(name), content).unwrap();
    }
}

pub fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}
