//! WebSocket 服务端核心服务：绑定监听地址并为每个连接启动分发循环。

use crate::config::WebSocketConfig;
use crate::error::AppError;
use crate::state::ServerState;
use crate::ws_server::message_router;
use anyhow::{Context, Result};
use dashboard_ws_utils::server::transport::{ConnectionHandler, ServerTransport, WsReceiver};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

/// WebSocket 服务结构体，封装了监听器和共享状态。
pub struct WsService {
    transport: ServerTransport,
    state: Arc<ServerState>,
}

impl WsService {
    /// 绑定配置的监听地址。绑定失败时返回错误，由调用方中止启动。
    pub async fn bind(config: &WebSocketConfig, state: Arc<ServerState>) -> Result<Self, AppError> {
        let listen_addr = config.listen_addr();
        info!("[WsService] 正在绑定监听地址: {}", listen_addr);
        let transport = ServerTransport::bind(&listen_addr).await?;
        Ok(Self { transport, state })
    }

    /// 实际监听的地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// 接受连接直到收到停止信号。返回时监听器已关闭，已有连接继续运行。
    pub async fn run(self, stop: watch::Receiver<bool>) -> Result<()> {
        let WsService { transport, state } = self;
        let local_addr = transport.local_addr();
        info!("[WsService] 开始在 {} 上接受 WebSocket 连接。", local_addr);

        let on_new_connection = move |handler: ConnectionHandler, receiver: WsReceiver| {
            let state = Arc::clone(&state);
            async move { message_router::handle_connection(state, handler, receiver).await }
        };

        transport
            .serve(on_new_connection, stop)
            .await
            .with_context(|| format!("WebSocket 服务 {} 运行失败", local_addr))?;

        info!("[WsService] 已停止在 {} 上接受新连接。", local_addr);
        Ok(())
    }
}
