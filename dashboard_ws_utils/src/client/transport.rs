// dashboard_ws_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 提供连接统计服务端、发送 JSON 请求帧并接收文本响应的最小客户端，
//! 供集成测试和命令行探测使用。

use crate::error::WsError; // 引入本库定义的统一错误类型
use crate::message::{receive_text, text_frame};
use futures_util::{
    stream::{SplitSink, SplitStream}, // 用于将 WebSocket 流拆分为发送端和接收端
    SinkExt,
    StreamExt,
};
use log::{debug, error, info};
use serde::Serialize;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, WebSocketStream};
use url::Url; // 用于解析和处理 URL

/// `ClientWsStream` 类型别名，代表客户端连接成功后返回的 WebSocket 流。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// `ClientConnection` 结构体代表一个活动的客户端 WebSocket 连接。
pub struct ClientConnection {
    /// 用于向服务器发送帧的发送端。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 用于从服务器接收帧的接收端。
    pub ws_receiver: SplitStream<ClientWsStream>,
}

impl ClientConnection {
    /// 把负载序列化为 JSON 文本帧并发送。
    pub async fn send_json<T: Serialize>(&mut self, payload: &T) -> Result<(), WsError> {
        let frame = text_frame(payload)?;
        self.ws_sender.send(frame).await?;
        Ok(())
    }

    /// 原样发送一段文本（测试格式错误的请求时使用）。
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), WsError> {
        self.ws_sender.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// 接收下一条文本帧；语义同 [`receive_text`]。
    pub async fn receive_text(&mut self) -> Option<Result<String, WsError>> {
        receive_text(&mut self.ws_receiver).await
    }

    /// 发送 Close 帧，结束连接。
    pub async fn close(&mut self) -> Result<(), WsError> {
        self.ws_sender.close().await?;
        Ok(())
    }
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// # Arguments
/// * `url_str` - 服务器 URL，例如 `"ws://127.0.0.1:9000"`。
pub async fn connect_client(url_str: &str) -> Result<ClientConnection, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
            debug!("客户端：WebSocket 连接响应头: {:?}", response.headers());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}
