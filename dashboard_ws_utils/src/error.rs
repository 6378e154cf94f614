// dashboard_ws_utils/src/error.rs

//! 定义 WebSocket 传输层相关的错误类型。

use thiserror::Error; // 引入 thiserror 来简化错误类型的定义

/// WebSocket 传输层的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// 当 TCP 监听器无法绑定到指定地址时返回。
    #[error("TCP 监听器绑定 {addr} 失败: {source}")]
    TcpBindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 当 serde 序列化失败时返回。
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 当帧内容无法还原为文本（例如二进制帧不是合法的 UTF-8）时返回。
    /// 这类错误只影响当前这一帧，连接本身仍然可用。
    #[error("反序列化错误: {0}")]
    DeserializationError(String),

    /// WebSocket 协议相关的错误，例如握手失败、连接被重置等。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 底层 I/O 错误。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
}
