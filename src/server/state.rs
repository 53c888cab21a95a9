use std::sync::Arc;

use crate::service::ExtractionService;

/// 应用状态
pub struct AppState {
    /// 特征提取服务
    pub service: ExtractionService,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(service: ExtractionService) -> Arc<Self> {
        Arc::new(AppState { service })
    }
}
