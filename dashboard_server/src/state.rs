//! 服务端共享状态。
//!
//! 进程启动时创建一次，以 `Arc<ServerState>` 显式传给接收器、每个连接的分发循环
//! 以及每个请求处理任务。数据集只读，工作池与连接管理器内部自带同步，
//! 因此这里不需要任何锁。

use crate::activity::ActivityCounter;
use crate::dataset::DatasetStore;
use crate::worker_pool::WorkerPool;
use crate::ws_server::connection_manager::ConnectionManager;
use std::sync::Arc;

#[derive(Debug)]
pub struct ServerState {
    /// 只读数据集
    pub dataset: Arc<DatasetStore>,
    /// 执行统计计算的有界工作池
    pub pool: WorkerPool,
    /// 在线连接
    pub connections: ConnectionManager,
    /// 已派发但尚未写出响应的请求
    pub handoffs: Arc<ActivityCounter>,
}

impl ServerState {
    pub fn new(dataset: DatasetStore, pool: WorkerPool) -> Arc<Self> {
        Arc::new(Self {
            dataset: Arc::new(dataset),
            pool,
            connections: ConnectionManager::new(),
            handoffs: ActivityCounter::new(),
        })
    }
}
