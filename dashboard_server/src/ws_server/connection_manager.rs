//! WebSocket 连接管理。

use crate::ws_server::client_session::ClientSession;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use uuid::Uuid;

/// 管理所有活动的 WebSocket 客户端会话
///
/// 连接之间不共享任何可变的业务状态；这里只记录在线连接，供日志和关闭流程使用。
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    /// Key: client_id，Value: 会话
    clients: Arc<DashMap<Uuid, Arc<ClientSession>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为新完成握手的连接创建会话并登记。
    pub fn add_client(&self, addr: SocketAddr, sender: mpsc::Sender<Message>) -> Arc<ClientSession> {
        let client_session = Arc::new(ClientSession::new(addr, sender));
        self.clients.insert(client_session.client_id, Arc::clone(&client_session));

        info!("新客户端连接成功: id={}, addr={}", client_session.client_id, client_session.addr);
        debug!("当前活动客户端总数: {}", self.clients.len());
        client_session
    }

    pub fn get_client(&self, client_id: &Uuid) -> Option<Arc<ClientSession>> {
        self.clients.get(client_id).map(|entry| Arc::clone(entry.value()))
    }

    /// 连接结束后移除其会话。
    pub fn remove_client(&self, client_id: &Uuid) -> Option<Arc<ClientSession>> {
        match self.clients.remove(client_id) {
            Some((_id, session)) => {
                info!(
                    "客户端断开连接: id={}, addr={}, 在线时长={}秒",
                    session.client_id,
                    session.addr,
                    session.connected_seconds()
                );
                debug!("移除后当前活动客户端总数: {}", self.clients.len());
                Some(session)
            }
            None => {
                warn!("尝试移除不存在的客户端: id={}", client_id);
                None
            }
        }
    }

    /// 当前在线的连接数。
    pub fn active_count(&self) -> usize {
        self.clients.len()
    }
}
