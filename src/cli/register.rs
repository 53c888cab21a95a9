use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{info, warn};
use serde_json::{Map, Value, json};

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts, StoreOptions};
use crate::registrar::{DEFAULT_SUFFIX, PersonRegistrar, RegistrarOptions, RegistrationTotals, suffix_regex};
use crate::store::{MemoryCollection, VectorCollection};
use crate::utils::parse_person;

#[derive(Parser, Debug, Clone)]
pub struct RegisterCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    #[command(flatten)]
    pub store: StoreOptions,
    /// 要注册的人员，格式为 NAME=DIR，可重复指定
    #[arg(short, long = "person", value_name = "NAME=DIR", value_parser = parse_person)]
    pub people: Vec<(String, PathBuf)>,
    /// 人员名称到照片目录的 JSON 映射，按文件中的顺序注册
    /// 例：{"Derrick Lim": "./photos/derrick/"}
    #[arg(long, value_name = "FILE", verbatim_doc_comment)]
    pub people_file: Option<PathBuf>,
    /// 每人最多注册的照片数量
    #[arg(short, long, value_name = "N", default_value_t = 50)]
    pub max_photos: usize,
    /// 扫描的文件后缀名，多个后缀用逗号分隔，不区分大小写
    #[arg(short, long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,
    /// 每批处理的照片数量
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub batch_size: usize,
    /// 同一人的照片同时处理的数量
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,
    /// 多人合照时使用第一张人脸注册，而不是视为失败
    #[arg(long)]
    pub allow_multiple_faces: bool,
    /// 注册前重建集合，原有数据会被清空
    #[arg(long)]
    pub recreate: bool,
    /// 只提取特征，不写入向量数据库
    #[arg(long)]
    pub dry_run: bool,
    /// 以 JSON 格式输出汇总
    #[arg(long)]
    pub json: bool,
}

impl SubCommandExtend for RegisterCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let mut people = match &self.people_file {
            Some(file) => load_people(file)?,
            None => vec![],
        };
        people.extend(self.people.iter().cloned());
        if people.is_empty() {
            bail!("没有指定要注册的人员，请使用 --person 或 --people-file");
        }

        let extractor = self.model.extractor()?;
        let collection: Arc<dyn VectorCollection> = if self.dry_run {
            info!("试运行，特征不会写入向量数据库");
            Arc::new(MemoryCollection::new(self.store.schema(self.model.dimension)))
        } else {
            Arc::new(self.store.connect(self.model.dimension).await?)
        };
        if self.recreate {
            collection.recreate().await.context("重建集合失败")?;
        }

        let options = RegistrarOptions {
            suffix: suffix_regex(&self.suffix),
            batch_size: self.batch_size,
            jobs: self.jobs,
            allow_multiple_faces: self.allow_multiple_faces,
        };
        let registrar = PersonRegistrar::new(extractor, collection.clone(), options);
        let totals = registrar.register_all(&people, self.max_photos).await;

        let total_embeddings = match collection.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("获取特征数量失败: {}", e);
                None
            }
        };

        if self.json {
            let output = json!({ "totals": totals, "totalEmbeddings": total_embeddings });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_summary(&totals, total_embeddings);
        }
        Ok(())
    }
}

/// 读取 JSON 对象形式的人员列表，保留文件中的顺序
fn load_people(file: &Path) -> Result<Vec<(String, PathBuf)>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("无法读取人员列表: {}", file.display()))?;
    let map: Map<String, Value> = serde_json::from_str(&text)
        .with_context(|| format!("人员列表必须是 JSON 对象: {}", file.display()))?;
    map.into_iter()
        .map(|(name, dir)| match dir {
            Value::String(dir) => Ok((name, PathBuf::from(dir))),
            other => Err(anyhow!("{} 的目录必须是字符串，实际为 {}", name, other)),
        })
        .collect()
}

fn print_summary(totals: &RegistrationTotals, total_embeddings: Option<u64>) {
    println!("People: {}", totals.people);
    println!("Total photos: {}", totals.photos);
    println!("Successful: {}", totals.successful);
    println!("Failed: {}", totals.failed);
    for e in &totals.person_errors {
        println!("  {}: {}", e.item, e.message);
    }
    if let Some(count) = total_embeddings {
        println!("Total embeddings: {}", count);
    }
}
