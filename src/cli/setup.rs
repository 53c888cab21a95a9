use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, StoreOptions};
use crate::store::VectorCollection;

#[derive(Parser, Debug, Clone)]
pub struct SetupCommand {
    #[command(flatten)]
    pub store: StoreOptions,
    /// 特征向量维度
    #[arg(long, value_name = "N", default_value_t = 512)]
    pub dimension: usize,
}

impl SubCommandExtend for SetupCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let collection = self.store.connect(self.dimension).await?;
        collection.recreate().await?;
        info!("集合 {} 已重建", self.store.collection);
        Ok(())
    }
}
