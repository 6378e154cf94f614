//! 把配置、数据集、工作池、接收器与关闭流程组装成一个可运行的服务。

use crate::config::AppConfig;
use crate::dataset::DatasetStore;
use crate::error::AppError;
use crate::shutdown::{self, ShutdownCoordinator};
use crate::state::ServerState;
use crate::worker_pool::WorkerPool;
use crate::ws_server::service::WsService;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub struct DashboardServer {
    service: WsService,
    state: Arc<ServerState>,
    shutdown: ShutdownCoordinator,
    grace_period: Duration,
}

impl DashboardServer {
    /// 创建工作池并绑定监听地址。
    pub async fn bind(config: &AppConfig, dataset: DatasetStore) -> Result<Self, AppError> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_pool.max_workers)?;
        info!(
            "[服务] 数据集已就绪: {} 行, {} 个特征, {} 个类别",
            dataset.row_count(),
            dataset.feature_count(),
            dataset.class_names().len()
        );
        let state = ServerState::new(dataset, pool);
        let service = WsService::bind(&config.websocket, Arc::clone(&state)).await?;
        Ok(Self {
            service,
            state,
            shutdown: ShutdownCoordinator::new(),
            grace_period: config.shutdown.grace_period(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.service.local_addr()
    }

    /// 用于从外部（信号处理任务或测试）发出停止信号。
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// 运行直到收到停止信号，随后完成关闭流程。
    pub async fn run(self) -> anyhow::Result<()> {
        let DashboardServer { service, state, shutdown: coordinator, grace_period } = self;
        service.run(coordinator.subscribe()).await?;
        shutdown::drain(&state, grace_period).await;
        Ok(())
    }
}
