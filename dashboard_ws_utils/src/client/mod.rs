// dashboard_ws_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 提供连接服务端、发送 JSON 请求帧和接收响应文本的简化 API。

pub mod transport; // 客户端传输层：connect_client 与 ClientConnection
