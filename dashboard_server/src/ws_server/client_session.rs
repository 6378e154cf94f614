use chrono::{DateTime, Utc};
use dashboard_ws_utils::error::WsError;
use dashboard_ws_utils::message::text_frame;
use serde::Serialize;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use uuid::Uuid;

/// 一个已完成握手的 WebSocket 连接在服务端的会话信息。
///
/// 会话本身不可变；连接上的所有写操作都经 `sender` 投递给该连接专属的发送任务，
/// 因此并发的请求处理任务之间不会争用 WebSocket 的发送半部。
#[derive(Debug)]
pub struct ClientSession {
    /// 服务端为此连接生成的唯一标识 (UUID v4)，用于日志关联。
    pub client_id: Uuid,

    /// 客户端的网络地址。
    pub addr: SocketAddr,

    /// 握手完成的时间 (UTC)。
    pub connected_at: DateTime<Utc>,

    /// 发往此客户端的帧队列，由发送任务消费。
    pub sender: mpsc::Sender<Message>,
}

impl ClientSession {
    pub fn new(addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            addr,
            connected_at: Utc::now(),
            sender,
        }
    }

    /// 把一段已序列化的响应文本投递给发送任务。
    ///
    /// 发送任务已经结束（连接关闭）时返回 `false`。
    pub async fn send_text(&self, text: String) -> bool {
        self.sender.send(Message::Text(text)).await.is_ok()
    }

    /// 序列化 `payload` 并投递给发送任务。
    pub async fn send_json<T: Serialize>(&self, payload: &T) -> Result<bool, WsError> {
        let frame = text_frame(payload)?;
        Ok(self.sender.send(frame).await.is_ok())
    }

    /// 连接已持续的时长（秒）。
    pub fn connected_seconds(&self) -> i64 {
        (Utc::now() - self.connected_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_models::MeansResponse;
    use dashboard_models::MessageAction;

    #[tokio::test]
    async fn test_frames_are_queued_for_sender_task() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = ClientSession::new("127.0.0.1:40000".parse().expect("地址解析失败"), tx);
        assert!(session.connected_seconds() >= 0);

        assert!(session.send_text("{\"action\":2}".to_string()).await);
        let response = MeansResponse { action: MessageAction::PassOverallMeans, means: vec![0.5], count: 1 };
        assert!(session.send_json(&response).await.expect("序列化响应失败"));

        assert_eq!(rx.recv().await, Some(Message::Text("{\"action\":2}".to_string())));
        match rx.recv().await {
            Some(Message::Text(text)) => assert!(text.contains("\"means\":[0.5]")),
            other => panic!("期望文本帧，实际为 {:?}", other),
        }

        drop(rx);
        assert!(!session.send_text("late".to_string()).await, "发送任务结束后投递应失败");
    }
}
