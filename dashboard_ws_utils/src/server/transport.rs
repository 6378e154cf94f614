// dashboard_ws_utils/src/server/transport.rs

//! 包含服务端 WebSocket 监听、接受连接和通信逻辑。

use crate::error::WsError; // 引入自定义错误类型
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// `WsStream` 是一个类型别名，代表经过 WebSocket 握手后的 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// 服务端连接的接收半部。
pub type WsReceiver = SplitStream<WsStream>;

/// 服务端单个连接的发送半部及其对端信息。
///
/// 握手成功后，`ServerTransport` 把连接拆分为 `ConnectionHandler`（负责写）
/// 与 `WsReceiver`（负责读），二者一并交给上层回调。
pub struct ConnectionHandler {
    ws_sender: SplitSink<WsStream, Message>,
    peer_addr: SocketAddr,
}

impl ConnectionHandler {
    /// 连接方的地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// 发送一帧到客户端。
    pub async fn send(&mut self, frame: Message) -> Result<(), WsError> {
        self.ws_sender.send(frame).await?;
        Ok(())
    }

    /// 向客户端发送 Close 帧并关闭发送半部。连接已断开时的错误会被忽略。
    pub async fn close(&mut self) {
        if let Err(e) = self.ws_sender.close().await {
            debug!("关闭与 {} 的发送通道时出错（连接可能已断开）: {}", self.peer_addr, e);
        }
    }
}

/// `ServerTransport` 结构体负责 WebSocket 服务端的监听和连接接受。
pub struct ServerTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ServerTransport {
    /// 绑定 TCP 监听器。绑定失败属于启动期的致命错误，由调用方决定如何中止。
    ///
    /// # Arguments
    /// * `addr`: 监听地址，例如 `"0.0.0.0:9000"`；端口为 0 时由操作系统分配。
    pub async fn bind(addr: &str) -> Result<Self, WsError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| WsError::TcpBindError {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!("WebSocket 服务器正在监听地址: {}", local_addr);
        Ok(Self { listener, local_addr })
    }

    /// 实际监听的地址（端口为 0 时可据此得知分配到的端口）。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 持续接受连接，直到 `stop` 变为 `true`。
    ///
    /// 每个 TCP 连接在独立的 Tokio 任务中完成握手，随后调用 `on_connect`，
    /// 同时在线的连接数不设上限。收到停止信号后监听器被释放，此后新的连接请求
    /// 会在传输层被拒绝；已经建立的连接不受影响，继续运行到各自关闭为止。
    ///
    /// # Arguments
    /// * `on_connect`: 握手成功后的回调，参数为发送半部、接收半部。
    /// * `stop`: 停止信号；发送端被丢弃同样视为停止。
    pub async fn serve<F, Fut>(self, on_connect: F, mut stop: watch::Receiver<bool>) -> Result<(), WsError>
    where
        F: Fn(ConnectionHandler, WsReceiver) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ServerTransport { listener, local_addr } = self;

        if *stop.borrow() {
            info!("WebSocket 服务器 {} 在开始接受连接前已收到停止信号。", local_addr);
            return Ok(());
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((tcp_stream, peer_addr)) => {
                        debug!("从 {} 接受了新的 TCP 连接", peer_addr);
                        let on_connect_callback = on_connect.clone();
                        tokio::spawn(async move {
                            match accept_async(tcp_stream).await {
                                Ok(ws_stream) => {
                                    info!("与 {} 的 WebSocket 握手成功", peer_addr);
                                    let (ws_sender, ws_receiver) = ws_stream.split();
                                    let handler = ConnectionHandler { ws_sender, peer_addr };
                                    on_connect_callback(handler, ws_receiver).await;
                                }
                                Err(e) => {
                                    // 握手失败只影响这一个连接
                                    error!("与 {} 的 WebSocket 握手失败: {}", peer_addr, e);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("接受 TCP 连接失败: {}。服务器将继续运行。", e);
                    }
                },
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        drop(listener);
        info!("WebSocket 服务器 {} 已停止接受新连接，监听器已关闭。", local_addr);
        Ok(())
    }
}
