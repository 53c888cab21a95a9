use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, StoreOptions};
use crate::store::VectorCollection;

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    #[command(flatten)]
    pub store: StoreOptions,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        // 计数与维度无关
        let collection = self.store.connect(0).await?;
        let count = collection.count().await?;
        println!("Total embeddings: {}", count);
        Ok(())
    }
}
