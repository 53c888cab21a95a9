use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::service::ExtractionService;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片路径
    pub image: PathBuf,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let data = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("无法读取图片: {}", self.image.display()))?;
        let service = ExtractionService::new(
            self.model.extractor()?,
            self.model.model_name.clone(),
            std::env::temp_dir(),
        );
        let extension = self.image.extension().and_then(|ext| ext.to_str());
        let response = service
            .extract_one(&data, extension)
            .await
            .with_context(|| format!("提取失败: {}", self.image.display()))?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}
