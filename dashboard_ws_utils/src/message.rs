// dashboard_ws_utils/src/message.rs

//! WebSocket 帧与应用层文本之间的转换。
//!
//! 统计协议的每一帧都是一个独立的 JSON 文本。本模块负责两件事：
//! 把可序列化的负载编码成文本帧，以及从接收流中取出下一条应用层文本，
//! 同时跳过 Ping/Pong 等控制帧。服务端与客户端共用同一套接收逻辑。

use crate::error::WsError;
use futures_util::{Stream, StreamExt};
use log::debug;
use serde::Serialize;
use tokio_tungstenite::tungstenite::{protocol::Message, Error as TungsteniteError};

/// 将负载序列化为 JSON 并包装成文本帧。
pub fn text_frame<T: Serialize>(payload: &T) -> Result<Message, WsError> {
    let text = serde_json::to_string(payload)
        .map_err(|e| WsError::SerializationError(format!("负载序列化为 JSON 失败: {}", e)))?;
    Ok(Message::Text(text))
}

/// 从给定的接收流中异步取出下一条应用层文本。
///
/// # Returns
/// * `Some(Ok(text))`：收到文本帧，或内容为合法 UTF-8 的二进制帧。
/// * `Some(Err(WsError::DeserializationError(_)))`：收到无法还原为文本的二进制帧，仅影响这一帧。
/// * `Some(Err(_))`：其他底层错误，通常意味着连接已不可用。
/// * `None`：对端关闭了连接（Close 帧、`ConnectionClosed` 或流结束）。
pub async fn receive_text<S>(receiver: &mut S) -> Option<Result<String, WsError>>
where
    S: Stream<Item = Result<Message, TungsteniteError>> + Unpin,
{
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => break Some(Ok(text)),
            Some(Ok(Message::Binary(bin))) => {
                debug!("收到二进制帧，长度: {} 字节", bin.len());
                break Some(String::from_utf8(bin).map_err(|e| {
                    WsError::DeserializationError(format!("二进制帧不是合法的 UTF-8 文本: {}", e))
                }));
            }
            Some(Ok(Message::Ping(data))) => {
                // Pong 由 tokio-tungstenite 自动回复
                debug!("收到 Ping 控制帧，数据长度: {}", data.len());
            }
            Some(Ok(Message::Pong(data))) => {
                debug!("收到 Pong 控制帧，数据长度: {}", data.len());
            }
            Some(Ok(Message::Close(close_frame))) => {
                debug!("收到 Close 控制帧: {:?}", close_frame);
                break None;
            }
            Some(Ok(Message::Frame(_))) => {
                debug!("收到底层原始 Frame，跳过。");
            }
            Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                debug!("接收时检测到连接已关闭。");
                break None;
            }
            Some(Err(e)) => break Some(Err(WsError::WebSocketProtocolError(e))),
            None => {
                debug!("接收流已结束。");
                break None;
            }
        }
    }
}
