use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, ServerOptions};
use crate::service::ExtractionService;
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    #[command(flatten)]
    pub server: ServerOptions,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let service = ExtractionService::new(
            self.model.extractor()?,
            self.model.model_name.clone(),
            self.server.temp_dir(),
        );

        // 创建应用状态
        let state = server::AppState::new(service);

        // 创建应用
        let app = server::create_app(state, self.server.upload_limit);

        // 启动服务器
        info!("服务器启动：http://{}，模型 {}", &self.server.addr, self.model.model_name);
        let listener = TcpListener::bind(&self.server.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
