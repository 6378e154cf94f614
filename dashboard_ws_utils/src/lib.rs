//! `dashboard_ws_utils` 是统计看板使用的 WebSocket 传输层 crate。
//!
//! 它封装 `tokio-tungstenite` 的细节，为服务端和测试客户端提供统一的帧收发接口。
//!
//! 主要模块包括：
//! - `message`: 负载与文本帧之间的编码，以及跳过控制帧的 `receive_text`。
//! - `error`: 传输层错误类型 `WsError`。
//! - `server`: 带停止信号的监听循环 `ServerTransport` 与连接发送端 `ConnectionHandler`。
//! - `client`: 客户端连接 `connect_client`。

pub mod client;
pub mod error;
pub mod message;
pub mod server;
