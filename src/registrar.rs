use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use indicatif::ProgressBar;
use log::{error, info, warn};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::face::{EmbeddingExtractor, ExtractError};
use crate::metrics;
use crate::store::{StoreError, VectorCollection};
use crate::utils::pb_style;

/// 默认允许的图片后缀
pub const DEFAULT_SUFFIX: &str = "jpg,jpeg,png,bmp,webp";

/// 单张照片注册失败的原因
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("检测到 {0} 张人脸，无法确定注册对象")]
    MultipleFaces(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub item: String,
    pub message: String,
}

/// 一个人的注册结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub successful: usize,
    pub failed: usize,
    /// 按处理顺序记录的失败原因
    pub errors: Vec<ItemError>,
    /// 整个目录无法处理时的原因，此时计数均为 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    fn rejected(message: String) -> Self {
        Self { error: Some(message), ..Default::default() }
    }

    pub fn processed(&self) -> usize {
        self.successful + self.failed
    }
}

/// 多人注册的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationTotals {
    pub people: usize,
    pub photos: usize,
    pub successful: usize,
    pub failed: usize,
    /// 整体失败的人员及原因
    pub person_errors: Vec<ItemError>,
}

impl RegistrationTotals {
    pub fn add(&mut self, person_name: &str, result: &BatchResult) {
        self.people += 1;
        self.photos += result.processed();
        self.successful += result.successful;
        self.failed += result.failed;
        if let Some(message) = &result.error {
            self.person_errors.push(ItemError { item: person_name.to_owned(), message: message.clone() });
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrarOptions {
    /// 允许的图片后缀，不区分大小写
    pub suffix: Regex,
    /// 每批处理的照片数量，只影响进度显示
    pub batch_size: usize,
    /// 同一人的照片同时处理的数量
    pub jobs: usize,
    /// 多人合照是否取第一张人脸注册
    pub allow_multiple_faces: bool,
}

impl Default for RegistrarOptions {
    fn default() -> Self {
        Self {
            suffix: suffix_regex(DEFAULT_SUFFIX),
            batch_size: 10,
            jobs: 1,
            allow_multiple_faces: false,
        }
    }
}

/// 由逗号分隔的后缀列表构建匹配整个扩展名的正则
pub fn suffix_regex(suffix: &str) -> Regex {
    let re = format!("(?i)^({})$", suffix.split(',').map(|s| regex::escape(s.trim())).collect::<Vec<_>>().join("|"));
    Regex::new(&re).expect("failed to build regex")
}

/// 列出目录下符合后缀的图片，按文件名排序后截取前 `max_photos` 张
pub fn discover_images(dir: &Path, suffix: &Regex, max_photos: usize) -> walkdir::Result<Vec<PathBuf>> {
    let mut images = vec![];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matched = entry
            .path()
            .extension()
            .is_some_and(|ext| suffix.is_match(&ext.to_string_lossy()));
        if matched {
            images.push(entry.into_path());
        }
    }
    images.truncate(max_photos);
    Ok(images)
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

pub struct PersonRegistrar {
    extractor: EmbeddingExtractor,
    collection: Arc<dyn VectorCollection>,
    options: RegistrarOptions,
}

impl PersonRegistrar {
    pub fn new(
        extractor: EmbeddingExtractor,
        collection: Arc<dyn VectorCollection>,
        options: RegistrarOptions,
    ) -> Self {
        Self { extractor, collection, options }
    }

    /// 提取一张照片的人脸特征并写入集合
    pub async fn register_image(&self, person_name: &str, image: &Path) -> Result<(), RegisterError> {
        let face = self.extractor.extract(image).await?;
        if face.faces_detected > 1 && !self.options.allow_multiple_faces {
            return Err(RegisterError::MultipleFaces(face.faces_detected));
        }
        self.collection.insert(person_name, face.vector).await?;
        Ok(())
    }

    /// 注册一个人目录下的照片
    ///
    /// 每张照片独立处理，失败只计数不会中断，已写入的记录也不会回滚。
    /// 目录不存在时返回带 `error` 的空结果。
    pub async fn register_person(&self, person_name: &str, dir: &Path, max_photos: usize) -> BatchResult {
        if !dir.is_dir() {
            warn!("{}: 目录不存在 {}", person_name, dir.display());
            return BatchResult::rejected(format!("目录不存在: {}", dir.display()));
        }
        let images = match discover_images(dir, &self.options.suffix, max_photos) {
            Ok(images) => images,
            Err(e) => {
                error!("{}: 扫描目录失败: {}", person_name, e);
                return BatchResult::rejected(format!("扫描目录失败: {e}"));
            }
        };

        info!("{} - {} 张照片", person_name, images.len());
        let mut result = BatchResult::default();

        for (i, batch) in images.chunks(self.options.batch_size.max(1)).enumerate() {
            let pb = ProgressBar::new(batch.len() as u64)
                .with_style(pb_style())
                .with_message(format!("{} 批次 {}", person_name, i + 1));

            let mut outcomes = futures::stream::iter(batch)
                .map(|image| async move { (image, self.register_image(person_name, image).await) })
                .buffered(self.options.jobs.max(1));

            while let Some((image, outcome)) = outcomes.next().await {
                self.record(&mut result, person_name, image, outcome, &pb);
                pb.inc(1);
            }
            pb.finish_and_clear();
        }

        info!("{}: {}/{} 张照片注册成功", person_name, result.successful, images.len());
        if result.failed > 0 {
            warn!("{}: {} 张照片失败", person_name, result.failed);
        }
        result
    }

    fn record(
        &self,
        result: &mut BatchResult,
        person_name: &str,
        image: &Path,
        outcome: Result<(), RegisterError>,
        pb: &ProgressBar,
    ) {
        let name = file_name(image);
        match outcome {
            Ok(()) => {
                result.successful += 1;
                metrics::inc_registered("ok");
            }
            Err(e) => {
                match &e {
                    RegisterError::Extract(ExtractError::NoFaceDetected) => {
                        pb.suspend(|| warn!("{}: {} 未检测到人脸", person_name, name));
                        metrics::inc_registered("no_face");
                    }
                    _ => {
                        pb.suspend(|| error!("{}: {} 注册失败: {:?}", person_name, image.display(), e));
                        metrics::inc_registered("error");
                    }
                }
                result.failed += 1;
                result.errors.push(ItemError { item: name, message: e.to_string() });
            }
        }
    }

    /// 依次注册每个人，单人失败不影响其他人
    ///
    /// 不做去重：同一个名字出现多次时，后面的记录会继续追加。
    pub async fn register_all(&self, people: &[(String, PathBuf)], max_photos: usize) -> RegistrationTotals {
        info!("批量注册 {} 人", people.len());
        let mut totals = RegistrationTotals::default();
        for (person_name, dir) in people {
            let result = self.register_person(person_name, dir, max_photos).await;
            totals.add(person_name, &result);
        }
        totals
    }
}
