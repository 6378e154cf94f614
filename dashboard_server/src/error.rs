use crate::dataset::DatasetError;
use dashboard_models::ws_payloads::{
    INTERNAL_ERROR, INVALID_INDEX_ERROR, MALFORMED_REQUEST_ERROR, SHUTDOWN_IN_PROGRESS_ERROR,
};
use dashboard_models::RequestDecodeError;
use dashboard_ws_utils::error::WsError;
use thiserror::Error;

/// 应用的主要错误类型
///
/// 请求级错误（`MalformedRequest`、`InvalidIndex`、`ShutdownInProgress`、`WorkerFailure`）
/// 只终止当前这一次请求的处理，连接保持打开；其余变体发生在启动阶段，会中止进程。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("请求格式错误: {0}")]
    MalformedRequest(#[from] RequestDecodeError),

    #[error("行索引 {index} 超出数据集范围 [0, {row_count})")]
    InvalidIndex { index: i64, row_count: usize },

    #[error("服务端正在关闭，拒绝新的计算任务")]
    ShutdownInProgress,

    #[error("工作池任务执行失败: {0}")]
    WorkerFailure(String),

    #[error("响应序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("数据集错误: {0}")]
    Dataset(#[from] DatasetError),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("WebSocket 服务错误: {0}")]
    WebSocketService(#[from] WsError),
}

impl AppError {
    /// 错误帧中 `error` 字段使用的种类名。
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedRequest(_) => MALFORMED_REQUEST_ERROR,
            AppError::InvalidIndex { .. } => INVALID_INDEX_ERROR,
            AppError::ShutdownInProgress => SHUTDOWN_IN_PROGRESS_ERROR,
            _ => INTERNAL_ERROR,
        }
    }
}
