//! 关闭协调。
//!
//! 终止信号到达后依次：通知接收器停止接受连接；在宽限期内等待已派发请求写出响应；
//! 排空工作池。

use crate::state::ServerState;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// 停止信号的持有者。可克隆，所有克隆共享同一个信号。
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self { sender: Arc::new(sender) }
    }

    /// 订阅停止信号，交给接收器使用。
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// 发出停止信号。重复调用无副作用。
    pub fn trigger(&self) {
        if !self.sender.send_replace(true) {
            info!("[关闭流程] 已发出停止信号。");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// 等待 Ctrl-C，Unix 上同时等待 SIGTERM。
///
/// 信号处理器注册失败时记录警告并永不返回，此时只能通过 `ShutdownCoordinator::trigger` 停止服务。
pub async fn wait_for_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("[关闭流程] 收到 Ctrl-C。"),
            Err(e) => {
                warn!("[关闭流程] 无法监听 Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("[关闭流程] 收到 SIGTERM。");
            }
            Err(e) => {
                warn!("[关闭流程] 无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// 停止接受连接之后的收尾：等待已派发的请求（最多 `grace_period`），再排空工作池。
pub async fn drain(state: &ServerState, grace_period: Duration) {
    let pending = state.handoffs.current();
    info!(
        "[关闭流程] 等待 {} 个已派发请求完成（宽限期 {:?}），当前在线连接数: {}",
        pending,
        grace_period,
        state.connections.active_count()
    );
    if tokio::time::timeout(grace_period, state.handoffs.wait_idle()).await.is_err() {
        warn!(
            "[关闭流程] 宽限期结束时仍有 {} 个请求未写出响应。",
            state.handoffs.current()
        );
    }

    state.pool.shutdown().await;
    info!("[关闭流程] 工作池已排空，关闭流程完成。");
}
